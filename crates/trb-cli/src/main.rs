//! trb - Tor Reproducible Builds CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trb_cli::cmd;
use trb_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { platform, version } => {
            cmd::build::build(&platform, version.as_deref()).await
        }
        Commands::Verify { version, platform } => {
            cmd::verify::verify(version.as_deref(), platform.as_deref()).await
        }
        Commands::Versions => cmd::versions::versions(),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
