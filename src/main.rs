//! docsnap CLI entry point.

use anyhow::Result;
use clap::Parser;

use docsnap::cli::{commands, handle_error, AppContext, Cli, Commands};
use docsnap::domain::models::Config;
use docsnap::infrastructure::config::ConfigLoader;
use docsnap::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, json_mode),
    };

    // Held until exit so buffered file logs are flushed
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json_mode),
    };

    if let Err(err) = run(cli, config).await {
        handle_error(err, json_mode);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let ctx = AppContext::build(config).await?;

    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, &ctx, cli.json).await,
        Commands::Ask(args) => commands::ask::execute(args, &ctx, cli.json).await,
        Commands::Search(args) => commands::search::execute(args, &ctx, cli.json).await,
        Commands::Snapshots(args) => commands::snapshots::execute(args, &ctx, cli.json).await,
    }
}
