//! Charter CLI - pull and push charts through a local OCI-style registry.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pull(args) => commands::pull::execute(&cli.registry, &args).await.map(drop),
        Commands::Push(args) => commands::push::execute(&cli.registry, &args).await.map(drop),
        Commands::Cache(args) => commands::cache::run(&cli.registry, &args),
        Commands::Version => {
            println!("charter {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
