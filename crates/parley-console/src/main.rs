//! Parley console entry point.

use std::error::Error;

use parley_console::config::ConsoleConfig;
use parley_console::session::Session;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so they never interleave with the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!("Starting Parley console");

    let config = ConsoleConfig::from_env()?;
    let session = Session::from_config(&config)?;

    session.run(BufReader::new(tokio::io::stdin())).await?;

    Ok(())
}
