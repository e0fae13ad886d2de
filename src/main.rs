use std::process::ExitCode;

fn main() -> ExitCode {
    match transcript_core::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", transcript_core::config::APP_NAME);
            ExitCode::FAILURE
        }
    }
}
