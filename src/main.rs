//! Smelter CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smelter::cli::{handle_error, Cli, Commands};
use smelter::domain::models::LoggingConfig;
use smelter::infrastructure::config::ConfigLoader;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => handle_error(&err),
    };
    init_tracing(&config.logging);

    let result = match cli.command {
        Commands::Run(args) => smelter::cli::commands::run::execute(args, &config).await,
        Commands::Detect(args) => smelter::cli::commands::detect::execute(args, &config).await,
        Commands::Coverage(args) => smelter::cli::commands::coverage::execute(args, &config).await,
    };

    if let Err(err) = result {
        handle_error(&err);
    }
}
