// src/workspace.rs

//! Ephemeral per-operation workspaces
//!
//! A workspace is a freshly allocated temporary directory holding the two
//! directories a recipe writes into:
//!
//! ```text
//! alpaca-XXXXXX/
//! ├── packages/
//! └── package_info/
//! ```
//!
//! Release is idempotent. A workspace that is dropped without being
//! released (for example while a panic unwinds) is still deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Prefix for workspace directory names
const WORKSPACE_PREFIX: &str = "alpaca-";

/// Subdirectory receiving the recipe's installable output
pub const PACKAGES_DIR: &str = "packages";

/// Subdirectory receiving the recipe's package metadata
pub const PACKAGE_INFO_DIR: &str = "package_info";

/// An isolated working area owned by one operation
#[derive(Debug)]
pub struct Workspace {
    /// None once released
    dir: Option<TempDir>,
    root: PathBuf,
}

impl Workspace {
    /// Allocate a uniquely named workspace under `parent`
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("failed to create workspace in {}: {}", parent.display(), e),
                ))
            })?;
        let root = dir.path().to_path_buf();

        fs::create_dir(root.join(PACKAGES_DIR))?;
        fs::create_dir(root.join(PACKAGE_INFO_DIR))?;

        debug!("Created workspace {}", root.display());
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    /// Root directory of the workspace
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR)
    }

    pub fn package_info_dir(&self) -> PathBuf {
        self.root.join(PACKAGE_INFO_DIR)
    }

    /// Whether the workspace has already been released
    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Delete the workspace directory
    ///
    /// Safe to call more than once. A directory that has already vanished is
    /// not an error; any other removal failure is logged and swallowed so it
    /// never masks the outcome of the operation.
    pub fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => debug!("Released workspace {}", self.root.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Workspace {} already removed", self.root.display())
            }
            Err(e) => warn!("Failed to remove workspace {}: {}", self.root.display(), e),
        }
    }
}

/// Allocation and release of workspaces
///
/// The dispatcher only talks to workspaces through this trait, so the
/// create/release pairing of an operation can be observed.
pub trait WorkspaceManager {
    fn create(&self) -> Result<Workspace>;

    fn release(&self, workspace: &mut Workspace) {
        workspace.release();
    }
}

/// Workspaces in a temporary directory
#[derive(Debug, Clone)]
pub struct TempWorkspaceManager {
    parent: PathBuf,
}

impl TempWorkspaceManager {
    /// Workspaces under `parent`
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
        }
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }
}

impl Default for TempWorkspaceManager {
    /// Workspaces under the system temporary directory
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl WorkspaceManager for TempWorkspaceManager {
    fn create(&self) -> Result<Workspace> {
        Workspace::create_in(&self.parent)
    }
}
