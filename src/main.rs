use clap::Parser;
use gameday::cli::Cli;
use gameday::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting gameday");

    // Load configuration
    let config = startup::load_config()?;

    startup::run(config, cli.command()).await
}
