// src/cli/mod.rs
//! CLI definitions for alpaca
//!
//! The positional arguments are collected as-is and validated by
//! [`alpaca::OperationRequest::from_args`], so a wrong argument count is
//! reported like every other usage error.

mod args;

pub use args::Cli;

use alpaca::Config;

impl Cli {
    /// Apply command line settings on top of the configuration file
    pub fn apply_to(&self, config: &mut Config) {
        config.general.verbose |= self.verbose;
        config.general.debug |= self.debug;
        config.general.quiet |= self.quiet;

        if !self.sources_roots.is_empty() {
            config.repository.sources_roots = self.sources_roots.clone();
        }
    }
}

/// Log filter directive for the requested verbosity
pub fn log_level(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positionals_are_one_free_list() {
        let cmd = Cli::command();
        let positionals: Vec<_> = cmd.get_positionals().map(|a| a.get_id().as_str()).collect();
        assert_eq!(positionals, vec!["args"]);
        assert_eq!(cmd.get_name(), "alpaca");
    }

    #[test]
    fn test_parse_flags_and_positionals() {
        let cli = Cli::try_parse_from([
            "alpaca",
            "-v",
            "--sources-root",
            "/srv/a",
            "-s",
            "/srv/b",
            "install",
            "core/binutils@2.44-1",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(!cli.debug);
        assert_eq!(cli.sources_roots, vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]);
        assert_eq!(cli.args, vec!["install", "core/binutils@2.44-1"]);
    }

    #[test]
    fn test_any_positional_count_reaches_validation() {
        let cli = Cli::try_parse_from(["alpaca"]).unwrap();
        assert!(cli.args.is_empty());

        let cli = Cli::try_parse_from(["alpaca", "install", "core/a", "core/b"]).unwrap();
        assert_eq!(cli.args.len(), 3);
    }

    #[test]
    fn test_apply_to_config() {
        let cli = Cli::try_parse_from(["alpaca", "-q", "-s", "/srv/x", "remove", "c/n"]).unwrap();
        let mut config = Config::default();
        config.general.verbose = true;

        cli.apply_to(&mut config);

        assert!(config.general.verbose);
        assert!(config.general.quiet);
        assert_eq!(config.repository.sources_roots, vec![PathBuf::from("/srv/x")]);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(false, false), "info");
        assert_eq!(log_level(true, false), "debug");
        assert_eq!(log_level(true, true), "trace");
        assert_eq!(log_level(false, true), "trace");
    }
}
