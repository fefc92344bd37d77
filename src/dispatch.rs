// src/dispatch.rs

//! Operation dispatch
//!
//! Validates the positional inputs into an [`OperationRequest`] and drives
//! the install pipeline: locate the recipe, allocate a workspace, run the
//! recipe, release the workspace. Every failure is fatal and surfaces
//! unchanged; nothing is retried.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::atom::PackageAtom;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::{locate_in, ExecutorConfig, LatestPolicy, RecipeExecutor, RecipePath};
use crate::workspace::{TempWorkspaceManager, WorkspaceManager};

/// Operation mode requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Install,
    Remove,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Install => "install",
            Mode::Remove => "remove",
        }
    }

    /// Whether the operation depends on configured settings
    ///
    /// Removal has no implementation, so its outcome never depends on the
    /// configuration file.
    pub fn reads_config(&self) -> bool {
        matches!(self, Mode::Install)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "install" => Ok(Mode::Install),
            "remove" => Ok(Mode::Remove),
            other => Err(Error::Usage(format!(
                "unknown mode '{}' (expected 'install' or 'remove')",
                other
            ))),
        }
    }
}

/// A validated operation, consumed once by [`Dispatcher::dispatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub mode: Mode,
    pub atom: PackageAtom,
}

impl OperationRequest {
    /// Validate `<mode> <atom>`
    ///
    /// The argument count is checked first, then the mode, then the atom.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let [mode, atom] = args else {
            return Err(Error::Usage(format!(
                "expected <mode> <atom>, got {} argument(s)",
                args.len()
            )));
        };

        let mode = mode.as_ref().parse()?;
        let atom = PackageAtom::parse(atom.as_ref())?;
        Ok(Self { mode, atom })
    }
}

/// Process-wide settings, built once at startup and read-only afterwards
#[derive(Debug, Clone)]
pub struct Context {
    /// Sources roots searched for recipes, in order
    pub sources_roots: Vec<PathBuf>,
    pub latest_policy: LatestPolicy,
    /// Parent directory for workspaces
    pub workspace_root: PathBuf,
    pub executor: ExecutorConfig,
}

impl Context {
    /// Build the context from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let executor = ExecutorConfig {
            interpreter: config.build.interpreter_path(),
            timeout: config.build.timeout(),
            quiet: config.general.quiet,
            target_architecture: config.environment.target_architecture.clone(),
            target_platform: config.environment.target_platform.clone(),
            target_root: config.target_root(),
            build_flags: config.build.flags.clone(),
        };

        Self {
            sources_roots: config.repository.sources_roots.clone(),
            latest_policy: config.repository.latest,
            workspace_root: config
                .environment
                .workspace_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            executor,
        }
    }

    /// Search only the given sources roots
    pub fn with_sources_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.sources_roots = roots;
        self
    }
}

/// Runs validated operations
pub struct Dispatcher<W: WorkspaceManager = TempWorkspaceManager> {
    context: Context,
    workspaces: W,
    executor: RecipeExecutor,
}

impl Dispatcher<TempWorkspaceManager> {
    /// Dispatcher allocating workspaces under the context's workspace root
    pub fn new(context: Context) -> Self {
        let workspaces = TempWorkspaceManager::new(context.workspace_root.clone());
        debug!("Workspaces go under {}", workspaces.parent().display());
        Self::with_workspace_manager(context, workspaces)
    }
}

impl<W: WorkspaceManager> Dispatcher<W> {
    pub fn with_workspace_manager(context: Context, workspaces: W) -> Self {
        let executor = RecipeExecutor::new(context.executor.clone());
        Self {
            context,
            workspaces,
            executor,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn workspaces(&self) -> &W {
        &self.workspaces
    }

    /// Run one operation
    ///
    /// On success returns the recipe that was executed.
    pub fn dispatch(&self, request: OperationRequest) -> Result<RecipePath> {
        debug!("Dispatching {} {}", request.mode, request.atom);
        match request.mode {
            Mode::Install => self.install(&request.atom),
            Mode::Remove => self.remove(&request.atom),
        }
    }

    /// Locate and run the recipe for `atom` in a fresh workspace
    ///
    /// The workspace is released exactly once whatever the recipe does.
    pub fn install(&self, atom: &PackageAtom) -> Result<RecipePath> {
        let recipe = locate_in(
            atom,
            &self.context.sources_roots,
            self.context.latest_policy,
        )?;

        let mut workspace = self.workspaces.create()?;
        let outcome = self.executor.execute(&recipe, &workspace);
        self.workspaces.release(&mut workspace);
        debug_assert!(workspace.is_released());

        outcome?.into_result(&recipe)?;
        info!("Installed {}", recipe.atom);
        Ok(recipe)
    }

    /// Removal has no implementation yet; nothing on disk is touched
    pub fn remove(&self, atom: &PackageAtom) -> Result<RecipePath> {
        debug!("Refusing to remove {}", atom);
        Err(Error::UnsupportedOperation(
            "remove is not implemented".to_string(),
        ))
    }
}
