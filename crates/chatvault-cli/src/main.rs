//! ChatVault CLI entry point.

use clap::Parser;
use chatvault_cli::{init_logging, load_config, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; an unreadable one is not.
    chatvault_core::env::load_dotenv()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose);

    // Run the command
    run(cli, config).await
}
