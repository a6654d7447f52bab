use std::process::ExitCode;

fn main() -> ExitCode {
    oohquote_cli::run()
}
