use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use user_service::{
    cli::{self, Cli},
    logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging();

    let result = cli.run().await;
    match &result {
        Ok(()) => info!("server exited"),
        Err(err) => error!(error = %err, "server exited with error"),
    }
    ExitCode::from(cli::exit_status(&result))
}
