//! difftest CLI entry point

fn main() {
    difftest::cli::init_logging();
    difftest::cli::run();
}
