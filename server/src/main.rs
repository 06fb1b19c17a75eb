use std::{net::IpAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use employee_server::{
    config::AppConfig,
    http::{self, AppState, ServeConfig},
};
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee records service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Create the employee table if it is missing, then exit.
    InitDb,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _obs = init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config).await,
        Command::InitDb => init_db(&config).await,
    }
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = platform_db::initialize(&config.database)
        .await
        .context("storage initialization failed")?;
    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let served = http::serve(cmd.into(), state).await;
    pool.close().await.context("failed to close storage pool")?;
    info!("storage pool closed");
    served
}

async fn init_db(config: &AppConfig) -> Result<()> {
    let pool = platform_db::initialize(&config.database)
        .await
        .context("storage initialization failed")?;
    pool.close().await.context("failed to close storage pool")?;
    info!("employee table ready");
    Ok(())
}
