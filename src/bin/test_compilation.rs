//! `test-compilation COMPILER RUNTIME INPUT`: both pipelines must print identical output.

use difftest::Scenario;

fn main() {
    difftest::cli::init_logging();
    difftest::cli::run_scenario_binary(Scenario::Equivalence);
}
