//! Command line interface

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cscan-rs", version, about = "Asset discovery over cyberspace search engines")]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to settings.yml")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search IP and domain targets on the target backends
    Targets {
        #[arg(short, long, help = "File with IPs, domains or URLs")]
        input: PathBuf,
        #[arg(short, long, help = "Result file (.csv or .json)")]
        output: PathBuf,
        #[arg(long = "engine", help = "Only use the named engine (repeatable)")]
        engines: Vec<String>,
        #[arg(long, value_enum, help = "Output format, guessed from the extension if omitted")]
        format: Option<OutputFormat>,
        #[arg(long, help = "Targets searched at once")]
        concurrency: Option<usize>,
        #[arg(long, help = "Pages fetched per target and backend")]
        max_page: Option<u32>,
    },
    /// Collect company assets on the company backends
    Companies {
        #[arg(short, long, help = "File with one company name per line")]
        input: PathBuf,
        #[arg(short, long, help = "Directory receiving one CSV per asset type")]
        output: PathBuf,
        #[arg(long, help = "Pages fetched per company and asset type")]
        max_page: Option<u32>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
