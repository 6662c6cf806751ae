// src/main.rs

use aptpress::cli::Cli;
use aptpress::exec::SystemRunner;
use aptpress::publish::PublishCoordinator;
use clap::Parser;
use tracing::error;

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_config();

    let mut coordinator = PublishCoordinator::new(config, SystemRunner::new());
    if let Err(e) = coordinator.run() {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
