use std::process::ExitCode;

fn main() -> ExitCode {
  run_fuel_lib::run()
}
