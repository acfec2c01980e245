use std::process::ExitCode;

fn main() -> ExitCode {
    yantra::cli::run()
}
