// src/recipe/executor.rs

//! Recipe execution
//!
//! A recipe is a bash script defining some of the phase functions in
//! [`RECIPE_PHASES`]. It is never sourced into this process: a fresh
//! interpreter sources it and calls each declared phase in order. Key
//! features:
//!
//! - Fixed environment interface (host environment cleared, `ALPACA_*`
//!   variables describe the workspace and package)
//! - Timeout protection (1 hour default), killing the whole process group
//! - stdin nullification to prevent hangs
//! - stdout/stderr streamed into the log, stderr tail kept for diagnostics

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::error::{Error, Result};
use crate::recipe::RecipePath;
use crate::workspace::Workspace;

/// Default timeout for a recipe run (1 hour)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default platform suffix of the target triple
pub const DEFAULT_TARGET_PLATFORM: &str = "aleya-linux-gnu";

/// Phase functions a recipe may define, in execution order
pub const RECIPE_PHASES: [&str; 4] = [
    "handle_sources",
    "handle_build",
    "handle_check",
    "handle_package",
];

/// Number of stderr lines kept for error reports
const DIAGNOSTIC_LINES: usize = 20;

/// Host variables forwarded into the recipe environment
const PASSTHROUGH_VARS: [&str; 4] = ["PATH", "HOME", "TERM", "LANG"];

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// How long to keep draining output once the recipe has exited
///
/// A process that left the recipe's process group can hold the pipes open
/// after the recipe is gone; its readers are detached after this.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Line the wrapper prints on stdout before each phase
const PHASE_MARKER: &str = "==> ";

/// Runs inside the child interpreter. The recipe and each phase run with the
/// shell's default error handling; only the status they return counts.
const WRAPPER: &str = r#"source "$ALPACA_RECIPE" || exit $?
for phase in handle_sources handle_build handle_check handle_package; do
    if declare -F "$phase" > /dev/null; then
        export ALPACA_PHASE="$phase"
        echo "==> $phase"
        "$phase" || exit $?
    fi
done
"#;

/// Compiler and build tool flags handed to recipes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildFlags {
    pub c_flags: Option<String>,
    pub cpp_flags: Option<String>,
    pub ld_flags: Option<String>,
    pub make_flags: Option<String>,
    pub ninja_flags: Option<String>,
}

impl BuildFlags {
    /// Environment variables for the flags that are set
    fn env_vars(&self) -> Vec<(&'static str, String)> {
        [
            ("CFLAGS", &self.c_flags),
            ("CXXFLAGS", &self.cpp_flags),
            ("LDFLAGS", &self.ld_flags),
            ("MAKEFLAGS", &self.make_flags),
            ("NINJAFLAGS", &self.ninja_flags),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

/// Configuration for the recipe executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Shell used to run recipes
    pub interpreter: PathBuf,
    /// Wall-clock limit for a recipe run (zero disables the limit)
    pub timeout: Duration,
    /// Keep recipe output out of the log
    pub quiet: bool,
    pub target_architecture: String,
    pub target_platform: String,
    /// Staging root prepared outside of alpaca, if any
    pub target_root: Option<PathBuf>,
    pub build_flags: BuildFlags,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("/bin/bash"),
            timeout: DEFAULT_TIMEOUT,
            quiet: false,
            target_architecture: std::env::consts::ARCH.to_string(),
            target_platform: DEFAULT_TARGET_PLATFORM.to_string(),
            target_root: None,
            build_flags: BuildFlags::default(),
        }
    }
}

/// Why a recipe run did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Exited with a nonzero status
    Exited(i32),
    /// Terminated by a signal
    Signaled(i32),
    /// Killed after exceeding the timeout
    TimedOut(Duration),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Exited(code) => write!(f, "exit code {}", code),
            FailureReason::Signaled(signal) => write!(f, "killed by signal {}", signal),
            FailureReason::TimedOut(limit) => {
                write!(f, "timed out after {} seconds", limit.as_secs())
            }
        }
    }
}

/// Result of running a recipe to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    Failure {
        reason: FailureReason,
        /// Last lines the recipe wrote to stderr
        diagnostics: String,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }

    /// Turn a failed run into [`Error::RecipeExecution`] for `recipe`
    pub fn into_result(self, recipe: &RecipePath) -> Result<()> {
        match self {
            ExecutionOutcome::Success => Ok(()),
            ExecutionOutcome::Failure {
                reason,
                diagnostics,
            } => Err(Error::RecipeExecution {
                atom: recipe.atom.to_string(),
                recipe: recipe.path.clone(),
                reason,
                diagnostics,
            }),
        }
    }
}

/// Recipe executor
pub struct RecipeExecutor {
    config: ExecutorConfig,
}

impl RecipeExecutor {
    /// Create a new executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Run a located recipe inside `workspace`
    ///
    /// Returns `Err` only when the recipe cannot be started at all; anything
    /// that goes wrong once it runs is reported as
    /// [`ExecutionOutcome::Failure`].
    pub fn execute(&self, recipe: &RecipePath, workspace: &Workspace) -> Result<ExecutionOutcome> {
        if workspace.is_released() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("workspace {} was already released", workspace.root().display()),
            )));
        }

        let interpreter = &self.config.interpreter;
        if !interpreter.is_file() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("recipe interpreter not found: {}", interpreter.display()),
            )));
        }

        let build_id = self.build_id(recipe)?;
        self.log_package_info(recipe, workspace, &build_id);

        let mut child = Command::new(interpreter)
            .arg("-c")
            .arg(WRAPPER)
            .arg(format!("alpaca:{}", recipe.atom))
            .current_dir(workspace.root())
            .env_clear()
            .envs(passthrough_env())
            .envs(self.recipe_env(recipe, workspace, &build_id))
            .stdin(Stdio::null()) // CRITICAL: Prevent stdin hangs
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("failed to start {}: {}", interpreter.display(), e),
                ))
            })?;

        // Output printed while sourcing is labelled with the package name
        let phase = Arc::new(Mutex::new(recipe.atom.name.clone()));
        let stdout = child
            .stdout
            .take()
            .map(|s| PipeReader::spawn(s, Arc::clone(&phase), false, self.config.quiet));
        let stderr = child
            .stderr
            .take()
            .map(|s| PipeReader::spawn(s, phase, true, self.config.quiet));

        let status = self.wait(&mut child)?;

        let deadline = Instant::now() + OUTPUT_GRACE;
        if let Some(reader) = stdout {
            reader.finish(deadline);
        }
        let diagnostics = stderr
            .map(|reader| reader.finish(deadline))
            .map(|tail| tail.into_iter().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        let outcome = match status {
            None => ExecutionOutcome::Failure {
                reason: FailureReason::TimedOut(self.config.timeout),
                diagnostics,
            },
            Some(status) if status.success() => ExecutionOutcome::Success,
            Some(status) => ExecutionOutcome::Failure {
                reason: failure_reason(status),
                diagnostics,
            },
        };

        match &outcome {
            ExecutionOutcome::Success => info!("Recipe for {} completed successfully", recipe.atom),
            ExecutionOutcome::Failure { reason, .. } => {
                warn!("Recipe for {} failed: {}", recipe.atom, reason)
            }
        }

        Ok(outcome)
    }

    /// Wait for the recipe, killing its process group on timeout
    ///
    /// Returns None if the timeout expired.
    fn wait(&self, child: &mut Child) -> Result<Option<ExitStatus>> {
        if self.config.timeout.is_zero() {
            return Ok(Some(child.wait()?));
        }

        match child.wait_timeout(self.config.timeout)? {
            Some(status) => Ok(Some(status)),
            None => {
                warn!(
                    "Recipe exceeded {} seconds, killing process group {}",
                    self.config.timeout.as_secs(),
                    child.id()
                );
                // process_group(0) made the child a group leader
                if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
                    debug!("killpg failed: {}", e);
                    let _ = child.kill();
                }
                child.wait()?;
                Ok(None)
            }
        }
    }

    /// Environment variables making up the recipe interface
    fn recipe_env(
        &self,
        recipe: &RecipePath,
        workspace: &Workspace,
        build_id: &str,
    ) -> Vec<(&'static str, OsString)> {
        let atom = &recipe.atom;
        let (version, release) = atom.version_release();
        let recipe_dir = recipe.path.parent().unwrap_or(recipe.path.as_path());

        let mut env: Vec<(&'static str, OsString)> = vec![
            ("ALPACA_WORKSPACE", workspace.root().into()),
            ("ALPACA_PACKAGES_DIR", workspace.packages_dir().into()),
            ("ALPACA_PACKAGE_INFO_DIR", workspace.package_info_dir().into()),
            ("ALPACA_RECIPE", recipe.path.clone().into()),
            ("ALPACA_RECIPE_DIR", recipe_dir.into()),
            ("ALPACA_PACKAGE_ATOM", atom.to_string().into()),
            ("ALPACA_PACKAGE_CHANNEL", atom.channel.clone().into()),
            ("ALPACA_PACKAGE_NAME", atom.name.clone().into()),
            ("ALPACA_PACKAGE_VERSION", version.into()),
            ("ALPACA_PACKAGE_RELEASE", release.into()),
            ("ALPACA_TARGET_ARCH", self.config.target_architecture.clone().into()),
            ("ALPACA_TARGET_PLATFORM", self.config.target_platform.clone().into()),
            ("ALPACA_BUILD_ID", build_id.into()),
        ];

        if let Some(root) = &self.config.target_root {
            env.push(("ALPACA_TARGET_ROOT", root.clone().into()));
        }

        env.extend(
            self.config
                .build_flags
                .env_vars()
                .into_iter()
                .map(|(k, v)| (k, v.into())),
        );

        env
    }

    /// Identity of a recipe run: sha256 over the recipe text and target arch
    fn build_id(&self, recipe: &RecipePath) -> Result<String> {
        let script = fs::read(&recipe.path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("failed to read recipe {}: {}", recipe.path.display(), e),
            ))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&script);
        hasher.update(self.config.target_architecture.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    fn log_package_info(&self, recipe: &RecipePath, workspace: &Workspace, build_id: &str) {
        info!("Building package {}", recipe.atom);
        info!("  Recipe: {}", recipe.path.display());
        info!(
            "  Target: {}-{}",
            self.config.target_architecture, self.config.target_platform
        );
        info!("  Build id: {}", build_id);
        debug!("  Workspace: {}", workspace.root().display());
        debug!("  Interpreter: {}", self.config.interpreter.display());
    }
}

fn passthrough_env() -> Vec<(&'static str, OsString)> {
    PASSTHROUGH_VARS
        .iter()
        .filter_map(|key| std::env::var_os(key).map(|v| (*key, v)))
        .chain(
            std::env::var_os("PATH")
                .is_none()
                .then(|| ("PATH", OsString::from(FALLBACK_PATH))),
        )
        .collect()
}

fn failure_reason(status: ExitStatus) -> FailureReason {
    match (status.code(), status.signal()) {
        (Some(code), _) => FailureReason::Exited(code),
        (None, Some(signal)) => FailureReason::Signaled(signal),
        (None, None) => FailureReason::Exited(-1),
    }
}

/// Phase named by a wrapper marker line
fn phase_marker(line: &str) -> Option<&'static str> {
    let name = line.strip_prefix(PHASE_MARKER)?;
    RECIPE_PHASES.iter().copied().find(|phase| *phase == name)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One of the child's pipes, drained into the log on a background thread
struct PipeReader {
    /// Last lines read
    tail: Arc<Mutex<VecDeque<String>>>,
    /// Disconnected once the pipe is closed
    done: Receiver<()>,
}

impl PipeReader {
    fn spawn<R: Read + Send + 'static>(
        stream: R,
        phase: Arc<Mutex<String>>,
        is_stderr: bool,
        quiet: bool,
    ) -> Self {
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(DIAGNOSTIC_LINES)));
        let (done_tx, done) = mpsc::channel::<()>();
        let shared_tail = Arc::clone(&tail);

        thread::spawn(move || {
            let _done = done_tx;
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }

                let line = String::from_utf8_lossy(&buf).trim_end().to_string();

                if !is_stderr && let Some(next) = phase_marker(&line) {
                    debug!("Entering phase {}", next);
                    *lock(&phase) = next.to_string();
                    continue;
                }

                if !quiet {
                    let label = lock(&phase).clone();
                    if is_stderr {
                        warn!("[{}] {}", label, line);
                    } else {
                        info!("[{}] {}", label, line);
                    }
                }

                let mut tail = lock(&shared_tail);
                if tail.len() == DIAGNOSTIC_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        });

        Self { tail, done }
    }

    /// Wait until `deadline` for the pipe to close and return the tail
    ///
    /// A reader still blocked at the deadline is left running detached.
    fn finish(self, deadline: Instant) -> VecDeque<String> {
        let grace = deadline.saturating_duration_since(Instant::now());
        if let Err(RecvTimeoutError::Timeout) = self.done.recv_timeout(grace) {
            debug!("Recipe output still open after exit, detaching reader");
        }
        lock(&self.tail).clone()
    }
}
