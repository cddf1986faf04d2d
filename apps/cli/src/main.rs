//! Dossier CLI — company research from the command line.
//!
//! Runs one research call (domain crawl, web search, external scraping,
//! directory probes) and prints the assembled context document.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
