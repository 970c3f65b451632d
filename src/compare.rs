//! Byte-exact comparison of captured output logs.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

const CHUNK: usize = 8192;

/// Result of comparing two logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Identical,
    /// The logs differ; `offset` is the first differing byte (or the length of the shorter log).
    Differs { offset: u64 },
}

impl Comparison {
    pub fn is_identical(&self) -> bool {
        matches!(self, Comparison::Identical)
    }
}

/// Compare two files byte for byte. No normalization of any kind.
pub fn compare_files(left: &Path, right: &Path) -> HarnessResult<Comparison> {
    let wrap = |source: io::Error| HarnessError::Compare {
        left: left.to_path_buf(),
        right: right.to_path_buf(),
        source,
    };

    let l = File::open(left).map_err(wrap)?;
    let r = File::open(right).map_err(wrap)?;
    compare_readers(BufReader::new(l), BufReader::new(r)).map_err(wrap)
}

/// Compare two byte streams.
pub fn compare_readers<L: Read, R: Read>(mut left: L, mut right: R) -> io::Result<Comparison> {
    let mut lbuf = [0u8; CHUNK];
    let mut rbuf = [0u8; CHUNK];
    let mut offset: u64 = 0;

    loop {
        let ln = read_full(&mut left, &mut lbuf)?;
        let rn = read_full(&mut right, &mut rbuf)?;

        let common = ln.min(rn);
        if let Some(pos) = lbuf[..common].iter().zip(&rbuf[..common]).position(|(a, b)| a != b) {
            return Ok(Comparison::Differs {
                offset: offset + pos as u64,
            });
        }
        if ln != rn {
            return Ok(Comparison::Differs {
                offset: offset + common as u64,
            });
        }
        if ln == 0 {
            return Ok(Comparison::Identical);
        }
        offset += ln as u64;
    }
}

/// Fill `buf` as far as the reader allows; short only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
