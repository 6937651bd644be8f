//! narrascope - narrative tracing and discovery for social-media corpora
//!
//! Usage:
//!   narrascope trace tweets.csv -n "narrative" --start 2024-01-01 --end 2024-03-31
//!   narrascope narratives tweets.csv -k 5
//!   narrascope rank tweets.csv -n "narrative A" -n "narrative B" --index 1
//!   narrascope --help               Show all commands

use anyhow::Result;
use clap::Parser;

use narrascope::cli::output::{print_error, OutputMode};
use narrascope::cli::{Cli, Commands};
use narrascope::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("narrascope=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_flags(cli.json, cli.md);
    let command: &Commands = &cli.command;

    let ctx = AppContext::new(cli.data_path.clone(), cli.config.as_deref()).await?;
    if let Err(e) = narrascope::cli::execute(command, &ctx, mode).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
