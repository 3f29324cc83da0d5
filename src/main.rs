//! scriptveil - obfuscate the inline scripts of an HTML document, then minify it.

mod cli;
mod config;
mod finish;
mod logger;
mod markup;
mod pipeline;
mod script;
mod transform;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Config::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build_document(&config).map(|_| ()),
        Commands::Scan { args } => cli::scan::scan_document(&config, args),
    }
}
