//! Shepherd CLI binary.

use anyhow::Result;
use shepherd::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the shepherd CLI.
///
/// Uses tokio's `current_thread` runtime: every phase of a run waits on the
/// previous one, so there is nothing to parallelize.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=shepherd=debug shepherd move 42 --status done
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shepherd=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting shepherd CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Shepherd CLI completed successfully");
    Ok(())
}
