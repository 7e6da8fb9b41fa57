mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use veil_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `veil host` keeps stdout for responses
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        cli::Commands::Scan { text } => commands::scan::handle(&config, &text).await,
        cli::Commands::Issues(cmd) => commands::issues::handle(cmd, &config).await,
        cli::Commands::Host => commands::host::handle(&config).await,
        cli::Commands::Adapter { url } => commands::adapter::handle(&url),
        cli::Commands::Preview { url, input } => commands::preview::handle(&config, &url, &input).await,
    }
}
