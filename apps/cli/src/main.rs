//! aptsheet CLI: turn scraped apartment listings into a comparison sheet.
//!
//! Reads listings from JSON, normalises them into one row per floorplan and
//! writes a CSV/TSV whose columns follow the active configuration.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
