mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::scan::ScanArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let default_filter = format!("zotomatic_cli={log_level},zotomatic_daemon={log_level}");
    let env_filter = std::env::var("ZOTOMATIC_LOG").unwrap_or(default_filter);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    let result = match cli.command {
        Commands::Scan { once, watch, path, force, summary_mode } => {
            commands::scan::execute(cli.config, ScanArgs { once, watch, path, force, summary_mode }).await
        }
    };

    if let Err(error) = &result {
        tracing::error!(%error, "scan run failed");
    }
    result
}
