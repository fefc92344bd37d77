// src/recipe/mod.rs

//! Recipes: locating and running package build scripts
//!
//! A recipe is a bash script describing how to build and install one
//! specific package version. Recipes live under a sources root:
//!
//! ```text
//! <sources-root>/<channel>/recipes/<name>/<name>-<version>.sh
//! ```
//!
//! The core only knows how to find a recipe and how to run it; what the
//! recipe builds is its own concern. A recipe may define these functions,
//! which run in order when present:
//!
//! ```bash
//! handle_sources() { tar xf "$ALPACA_RECIPE_DIR/src.tar.xz"; }
//! handle_build()   { ./configure --prefix=/usr && make $MAKEFLAGS; }
//! handle_check()   { make check; }
//! handle_package() { make DESTDIR="$ALPACA_PACKAGES_DIR" install; }
//! ```

mod executor;
mod locator;

pub use executor::{
    BuildFlags, ExecutionOutcome, ExecutorConfig, FailureReason, RecipeExecutor,
    DEFAULT_TARGET_PLATFORM, DEFAULT_TIMEOUT, RECIPE_PHASES,
};
pub use locator::{
    locate, locate_in, recipe_dir, recipe_path, LatestPolicy, RecipePath, LATEST_POINTER_FILE,
};
