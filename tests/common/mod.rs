// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated sources tree, workspace root and config file.
///
/// Keep the value alive for the duration of the test; dropping it removes
/// everything.
pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub sources: PathBuf,
    pub workspaces: PathBuf,
    pub config: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let sources = tmp.path().join("sources");
        let workspaces = tmp.path().join("work");
        for dir in [&home, &sources, &workspaces] {
            fs::create_dir_all(dir).unwrap();
        }

        let config = tmp.path().join("alpaca.toml");
        fs::write(
            &config,
            format!(
                "[environment]\nworkspace_root = \"{}\"\n\n[repository]\nsources_roots = [\"{}\"]\n\n[build]\ntimeout_secs = 60\n",
                workspaces.display(),
                sources.display()
            ),
        )
        .unwrap();

        Self {
            _tmp: tmp,
            home,
            sources,
            workspaces,
            config,
        }
    }

    /// Write `<sources>/<channel>/recipes/<name>/<name>-<version>.sh`
    pub fn add_recipe(&self, channel: &str, name: &str, version: &str, body: &str) -> PathBuf {
        let dir = self.recipe_dir(channel, name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}-{}.sh", name, version));
        fs::write(&path, body).unwrap();
        path
    }

    pub fn recipe_dir(&self, channel: &str, name: &str) -> PathBuf {
        self.sources.join(channel).join("recipes").join(name)
    }

    /// The binary using the sandbox config file
    pub fn cmd(&self) -> Command {
        let mut cmd = self.bare_cmd();
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    /// The binary with HOME and the working directory inside the sandbox,
    /// left to discover its own configuration
    pub fn bare_cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("alpaca").unwrap();
        cmd.env("HOME", &self.home)
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("ALPACA_CONFIG")
            .env_remove("ALPACA_TARGET_ROOT")
            .env_remove("RUST_LOG")
            .current_dir(&self.home);
        cmd
    }

    /// Number of entries left in the workspace root
    pub fn workspace_count(&self) -> usize {
        count_entries(&self.workspaces)
    }
}

pub fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
