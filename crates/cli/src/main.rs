use std::process::ExitCode;

fn main() -> ExitCode {
    nexure_cli::run()
}
