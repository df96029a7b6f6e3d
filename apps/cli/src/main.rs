//! docbot CLI — look up, read and extend documents by title.
//!
//! Drives the document helper and API client from the command line using
//! the same credentials a webhook deployment would read from its environment.

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
