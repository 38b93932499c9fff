use std::process::ExitCode;

use clap::Parser;
use pwcheck::cli::{self, Args};
use pwcheck::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // a missing .env file is not an error
    dotenvy::dotenv().ok();

    if let Err(e) = logging::init() {
        eprintln!("Error: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let args = Args::parse();
    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
