use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use flowdoc::cli::Cli;
use flowdoc::core::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let max_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(max_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting FlowDoc v{}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::new(cli.config.as_deref()).await?;

    cli.execute(engine).await
}
