// src/cli/args.rs
//! Command line arguments
//!
//! Depends only on clap so `build.rs` can render the man page from the same
//! definition.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "alpaca")]
#[command(author = "Aleya Contributors")]
#[command(version)]
#[command(about = "Install packages from Aleya source recipes", long_about = None)]
pub struct Cli {
    /// Configuration file (overrides the search path)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Debug output (implies --verbose)
    #[arg(short, long)]
    pub debug: bool,

    /// Do not log recipe output
    #[arg(short, long)]
    pub quiet: bool,

    /// Sources root to search for recipes (repeatable, replaces the configured roots)
    #[arg(short = 's', long = "sources-root", value_name = "DIR")]
    pub sources_roots: Vec<PathBuf>,

    /// <mode> <atom>: mode is `install` or `remove`, atom is `channel/name[@version]`
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,
}
