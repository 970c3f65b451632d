//! `test-runtime-error COMPILER RUNTIME INPUT`: the built program must fail when run.

use difftest::Scenario;

fn main() {
    difftest::cli::init_logging();
    difftest::cli::run_scenario_binary(Scenario::RunRejection);
}
