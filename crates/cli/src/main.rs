use std::process::ExitCode;

fn main() -> ExitCode {
    hireflow_cli::run()
}
