mod cli;
mod commands;
mod events;
mod fetch;
mod links;
mod model;
mod scraper_api;
mod tabanow;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover(args) => commands::discover::run(args).await,
        Commands::Enrich(args) => commands::enrich::run(args).await,
        Commands::Lookup(args) => commands::lookup::run(args).await,
        Commands::Parcel(args) => commands::parcel::run(args).await,
        Commands::Regulations(args) => commands::regulations::run(args).await,
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Events(args) => commands::events::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
