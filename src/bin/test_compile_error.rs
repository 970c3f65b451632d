//! `test-compile-error COMPILER RUNTIME INPUT`: the compiler under test must reject the program.

use difftest::Scenario;

fn main() {
    difftest::cli::init_logging();
    difftest::cli::run_scenario_binary(Scenario::BuildRejection);
}
