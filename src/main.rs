use anyhow::Result;
use clap::Parser;
use sortify::cli::{Cli, run_cli};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    run_cli(&cli)
}

/// Diagnostics go to stderr; stdout carries the user-facing report.
fn setup_logging(cli: &Cli) {
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
