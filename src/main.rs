//! `depsmith` binary

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use depsmith::cli::output::{display_error, OutputConfig};
use depsmith::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = OutputConfig::new(cli.quiet, cli.json, cli.verbose);

    // Logs go to stderr so --json stdout stays parseable; RUST_LOG overrides -v/-q
    let filter = EnvFilter::builder()
        .with_default_directive(output.log_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    output.apply_global();

    if let Err(e) = cli.run().await {
        display_error(&e);
        std::process::exit(1);
    }
    Ok(())
}
