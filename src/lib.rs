// src/lib.rs

//! Alpaca: install-time core of the Aleya source package manager
//!
//! Turns a package atom such as `core/binutils@2.44-1` into a recipe file
//! and runs that recipe in an ephemeral workspace.
//!
//! # Architecture
//!
//! - Atoms: `channel/name[@version]`, parsed into a [`PackageAtom`]
//! - Recipes: bash scripts under `<root>/<channel>/recipes/<name>/`
//! - Workspaces: one temporary directory per operation, always released
//! - Dispatch: `<mode> <atom>` validated into an [`OperationRequest`]

pub mod atom;
pub mod config;
pub mod dispatch;
mod error;
pub mod recipe;
pub mod version;
pub mod workspace;

pub use atom::{PackageAtom, LATEST_VERSION};
pub use config::Config;
pub use dispatch::{Context, Dispatcher, Mode, OperationRequest};
pub use error::{Error, Result};
pub use recipe::{
    ExecutionOutcome, ExecutorConfig, FailureReason, LatestPolicy, RecipeExecutor, RecipePath,
};
pub use version::RecipeVersion;
pub use workspace::{TempWorkspaceManager, Workspace, WorkspaceManager};
