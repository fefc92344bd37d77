// src/error.rs

//! Error types for the alpaca install core
//!
//! Every variant is fatal to the single operation that raised it. Each one
//! carries enough context (offending input, resolved path, recipe identity)
//! to be printed verbatim on stderr.

use std::path::PathBuf;
use thiserror::Error;

use crate::recipe::FailureReason;

/// Errors raised by the install pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed invocation (wrong argument count, invalid mode)
    #[error("usage: {0}")]
    Usage(String),

    /// Malformed atom string
    #[error("invalid atom '{input}': {reason}")]
    AtomSyntax { input: String, reason: &'static str },

    /// No recipe exists for the resolved channel/name/version
    #[error("package {channel}/{name}@{version} not found")]
    PackageNotFound {
        name: String,
        version: String,
        channel: String,
    },

    /// The requested mode exists but has no implementation
    #[error("{0}")]
    UnsupportedOperation(String),

    /// Workspace allocation or filesystem access failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The invoked recipe terminated abnormally
    #[error("recipe for {atom} ({}) failed: {reason}{}", .recipe.display(), format_diagnostics(.diagnostics))]
    RecipeExecution {
        atom: String,
        recipe: PathBuf,
        reason: FailureReason,
        diagnostics: String,
    },

    /// Configuration file could not be read or parsed
    #[error("configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Process exit code for this error
    ///
    /// Every kind currently maps to 1; callers should go through this so a
    /// per-kind mapping only has to change here.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_)
            | Error::AtomSyntax { .. }
            | Error::PackageNotFound { .. }
            | Error::UnsupportedOperation(_)
            | Error::Io(_)
            | Error::RecipeExecution { .. }
            | Error::Config { .. } => 1,
        }
    }
}

fn format_diagnostics(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!("\n{}", diagnostics)
    }
}

/// Result type for alpaca operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_all_fields() {
        let err = Error::PackageNotFound {
            name: "binutils".to_string(),
            version: "9.99-1".to_string(),
            channel: "core".to_string(),
        };
        assert_eq!(err.to_string(), "package core/binutils@9.99-1 not found");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_recipe_execution_message_includes_diagnostics() {
        let err = Error::RecipeExecution {
            atom: "core/zlib@1.3-1".to_string(),
            recipe: PathBuf::from("/src/core/recipes/zlib/zlib-1.3-1.sh"),
            reason: FailureReason::Exited(2),
            diagnostics: "make: *** [all] Error 2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("core/zlib@1.3-1"));
        assert!(msg.contains("zlib-1.3-1.sh"));
        assert!(msg.contains("exit code 2"));
        assert!(msg.ends_with("make: *** [all] Error 2"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
