//! Command line surface and the `serve` command

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    build_app,
    config::{self, ConfigCell, ConfigError, DEFAULT_CONFIG_PATH},
    domain::user::{GreetingService, UserHandler},
    server::{shutdown_signal, Server, ServerError, ShutdownOutcome},
    AppState,
};

#[derive(Debug, Parser)]
#[command(name = "server", version, about = "User RPC service")]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the RPC server
    Serve,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl Cli {
    /// Runs the command against the process-wide config.
    pub async fn run(self) -> Result<(), CliError> {
        self.run_with(config::process()).await
    }

    pub async fn run_with(self, configs: &ConfigCell) -> Result<(), CliError> {
        match self.command {
            Command::Serve => run_serve(&self.config, configs).await,
        }
    }
}

/// Process exit status for a finished command: 0 on success, 1 on any error.
pub fn exit_status(result: &Result<(), CliError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

async fn run_serve(config_path: &Path, configs: &ConfigCell) -> Result<(), CliError> {
    info!("starting server");

    configs.load(config_path)?;
    let config = configs.get();
    info!(
        host = %config.server.host,
        port = config.server.port,
        "config loaded"
    );

    let user_service = Arc::new(GreetingService::new());
    let user_handler = Arc::new(UserHandler::new(user_service));
    let app = build_app(AppState::new(user_handler));

    let server = Server::new(config.server.address(), app).bind().await?;

    match server.run_until(shutdown_signal()).await? {
        ShutdownOutcome::Graceful => {}
        ShutdownOutcome::Forced { abandoned } => {
            warn!(abandoned_calls = abandoned, "server forced to shut down");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;
    use tempfile::NamedTempFile;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_defaults_to_bundled_path() {
        let cli = Cli::try_parse_from(["server", "serve"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn config_flag_is_accepted_on_either_side() {
        for args in [
            ["server", "--config", "/etc/user.yaml", "serve"],
            ["server", "serve", "--config", "/etc/user.yaml"],
        ] {
            let cli = Cli::try_parse_from(args).expect("parse");
            assert_eq!(cli.config, PathBuf::from("/etc/user.yaml"));
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["server"]).is_err());
    }

    fn serve_cli(config_path: &Path) -> Cli {
        let path = config_path.to_str().expect("utf-8 path");
        Cli::try_parse_from(["server", "--config", path, "serve"]).expect("parse")
    }

    #[tokio::test]
    async fn unreadable_config_fails_serve() {
        let result = serve_cli(Path::new("/nonexistent/config.yaml"))
            .run_with(&ConfigCell::new())
            .await;

        assert_eq!(exit_status(&result), 1);
        let err = result.expect_err("serve must fail without config");
        assert!(matches!(err, CliError::Config(ConfigError::Read { .. })));
    }

    #[tokio::test]
    async fn occupied_port_fails_serve_with_exit_status_one() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.expect("occupy port");
        let port = occupied.local_addr().expect("occupied addr").port();
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "server:\n  host: 127.0.0.1\n  port: {port}\n").expect("write config");

        let result = serve_cli(file.path()).run_with(&ConfigCell::new()).await;

        assert_eq!(exit_status(&result), 1);
        let err = result.expect_err("bind must fail");
        assert!(matches!(err, CliError::Server(ServerError::Bind { .. })));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }

    #[test]
    fn success_exits_with_status_zero() {
        assert_eq!(exit_status(&Ok(())), 0);
    }
}
