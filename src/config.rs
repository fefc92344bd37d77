// src/config.rs

//! Configuration file handling
//!
//! Configuration is a TOML file. The first file found wins:
//!
//! 1. the path given with `--config`
//! 2. `$ALPACA_CONFIG` (ignored with a warning when the file is missing)
//! 3. `~/.config/alpaca/config.toml`
//! 4. `/etc/alpaca/config.toml`
//! 5. `./alpaca.toml`
//!
//! When no file exists the built-in defaults are used.
//!
//! ```toml
//! [general]
//! verbose = true
//!
//! [environment]
//! target_architecture = "x86_64"
//! workspace_root = "~/alpaca_workspace"
//!
//! [repository]
//! sources_roots = ["~/packages", "/srv/aleya/packages"]
//! latest = "scan"
//!
//! [build]
//! c_flags = "-O2 -pipe"
//! make_flags = "-j8"
//! timeout_secs = 7200
//! ```

use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::recipe::{BuildFlags, LatestPolicy, DEFAULT_TARGET_PLATFORM, DEFAULT_TIMEOUT};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "ALPACA_CONFIG";

/// Environment variable naming the externally staged install root
pub const TARGET_ROOT_ENV: &str = "ALPACA_TARGET_ROOT";

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/alpaca/config.toml";

/// Configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "alpaca.toml";

/// Sources root used when none is configured
pub const DEFAULT_SOURCES_ROOT: &str = "/var/lib/alpaca/sources";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub general: GeneralConfig,
    pub environment: EnvironmentConfig,
    pub repository: RepositoryConfig,
    pub build: BuildConfig,
}

/// `[general]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Debug-level logging
    pub verbose: bool,
    /// Trace-level logging
    pub debug: bool,
    /// Keep recipe output out of the log
    pub quiet: bool,
}

/// `[environment]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub target_architecture: String,
    pub target_platform: String,
    /// Parent directory for workspaces (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
    /// Install root staged by the external setup step
    pub target_root: Option<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            target_architecture: std::env::consts::ARCH.to_string(),
            target_platform: DEFAULT_TARGET_PLATFORM.to_string(),
            workspace_root: None,
            target_root: None,
        }
    }
}

/// `[repository]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Sources roots, searched in order
    pub sources_roots: Vec<PathBuf>,
    /// Resolution of the `latest` version sentinel
    pub latest: LatestPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            sources_roots: vec![PathBuf::from(DEFAULT_SOURCES_ROOT)],
            latest: LatestPolicy::default(),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    #[serde(flatten)]
    pub flags: BuildFlags,
    /// Recipe timeout in seconds (0 disables it)
    pub timeout_secs: u64,
    /// Shell running recipes: a path, or a name looked up on PATH
    pub interpreter: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            flags: BuildFlags::default(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            interpreter: "bash".to_string(),
        }
    }
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the interpreter to a path
    ///
    /// Bare names are looked up on PATH. A name that cannot be found is
    /// returned as-is; the executor reports it when a recipe is run.
    pub fn interpreter_path(&self) -> PathBuf {
        if self.interpreter.contains('/') {
            return expand_home(Path::new(&self.interpreter));
        }
        which::which(&self.interpreter).unwrap_or_else(|e| {
            debug!("Interpreter {} not found on PATH: {}", self.interpreter, e);
            PathBuf::from(&self.interpreter)
        })
    }
}

impl Config {
    /// Parse configuration text; `origin` is only used in error messages
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(text).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.repository.sources_roots.is_empty() {
            return Err(Error::Config {
                path: origin.to_path_buf(),
                message: "repository.sources_roots must name at least one directory".to_string(),
            });
        }

        config.expand_paths();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    /// Find and load the configuration file
    ///
    /// Returns the configuration and the file it came from, if any. An
    /// explicit path that does not exist is an error; the other locations
    /// are optional.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let candidates = candidate_paths(
            std::env::var_os(CONFIG_ENV),
            dirs::config_dir(),
            std::env::current_dir().ok(),
        );

        for path in candidates {
            debug!("Looking for configuration file at {}", path.display());
            if path.is_file() {
                debug!("Using configuration file {}", path.display());
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok((Self::default(), None))
    }

    /// Staging root from the config file, falling back to `$ALPACA_TARGET_ROOT`
    pub fn target_root(&self) -> Option<PathBuf> {
        self.environment.target_root.clone().or_else(|| {
            std::env::var_os(TARGET_ROOT_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }

    fn expand_paths(&mut self) {
        for root in &mut self.repository.sources_roots {
            *root = expand_home(root);
        }
        if let Some(path) = &mut self.environment.workspace_root {
            *path = expand_home(path);
        }
        if let Some(path) = &mut self.environment.target_root {
            *path = expand_home(path);
        }
    }
}

/// Configuration file locations in lookup order
fn candidate_paths(
    env_value: Option<OsString>,
    config_dir: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        if path.is_file() {
            paths.push(path);
        } else {
            warn!(
                "Configuration file from {} does not exist: {}. Ignoring",
                CONFIG_ENV,
                path.display()
            );
        }
    }

    if let Some(dir) = config_dir {
        paths.push(dir.join("alpaca").join("config.toml"));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
    if let Some(cwd) = cwd {
        paths.push(cwd.join(LOCAL_CONFIG_FILE));
    }

    paths
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
