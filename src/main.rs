use std::process::ExitCode;

fn main() -> ExitCode {
    fitsuite::cli::run()
}
