use std::process::ExitCode;

fn main() -> ExitCode {
    brainrelay_cli::run()
}
