// src/commands/mod.rs
//! Command handlers for the alpaca CLI

mod operation;

pub use operation::cmd_operation;

use anyhow::{Context as _, Result};
use alpaca::Config;
use std::path::Path;
use tracing::{debug, info};

/// Find and load the configuration file
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let (config, origin) = Config::discover(explicit).context("Failed to load configuration")?;

    match origin {
        Some(path) => info!("Using configuration {}", path.display()),
        None => debug!("Using built-in configuration"),
    }

    Ok(config)
}
