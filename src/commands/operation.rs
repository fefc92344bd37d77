// src/commands/operation.rs
//! Install and remove operations

use anyhow::{Context, Result};
use alpaca::{Dispatcher, Mode, OperationRequest, WorkspaceManager};
use tracing::info;

/// Run a validated operation through the dispatcher
pub fn cmd_operation<W: WorkspaceManager>(
    dispatcher: &Dispatcher<W>,
    request: OperationRequest,
) -> Result<()> {
    let mode = request.mode;
    let atom = request.atom.clone();
    match mode {
        Mode::Install => info!("Installing package: {}", atom),
        Mode::Remove => info!("Removing package: {}", atom),
    }

    let recipe = dispatcher
        .dispatch(request)
        .with_context(|| format!("Failed to {} {}", mode, atom))?;

    println!("Installed {} ({})", recipe.atom, recipe.path.display());
    Ok(())
}
