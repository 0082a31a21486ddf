use clap::Parser;
use std::process::ExitCode;
use towerkit::cli::{execute, Cli};
use towerkit::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    if let Err(e) = init_logging(level) {
        eprintln!("{:#}", e);
    }

    tracing::debug!(
        "TowerKit v{} (built {})",
        towerkit::VERSION,
        towerkit::BUILD_DATE
    );

    match execute(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
