//! Command-line interface for srctool.
//!
//! Each command is implemented as a separate module with its own argument
//! structure and execution logic:
//!
//! - `refresh` - reconcile cached upstream tarballs against the recipe and
//!   rewrite checksums/metadata when anything changed
//! - `pin` - update the pinned commit reference for the recipe's embedded
//!   upstream
//!
//! # Command Usage Patterns
//!
//! ```bash
//! # From inside a package directory containing stone.yaml
//! srctool refresh
//!
//! # Report only, never rewrite
//! srctool refresh --dry-run
//!
//! # Refresh a recipe somewhere else, with private cache roots
//! srctool --recipe ../pkg/stone.yaml refresh --cache-dir /tmp/cache
//!
//! # Re-pin the embedded upstream commit
//! srctool pin
//! ```
//!
//! # Global Options
//!
//! All commands support:
//! - `--verbose` - enable debug output
//! - `--quiet` - suppress log output (progress text still prints)
//! - `--recipe` - path to the recipe file (defaults to `./stone.yaml`)
//!
//! Both commands share the best-effort contract described in the crate docs:
//! progress and diagnostics go to stdout/stderr, and any fatal error exits
//! with status 1 - there are no distinct exit codes per failure class.

mod pin;
mod refresh;

use crate::constants::RECIPE_FILENAME;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration for CLI execution.
///
/// Holds the logging configuration derived from the global flags, enabling
/// dependency injection: tests and programmatic callers can execute commands
/// with their own config instead of touching global state through argument
/// parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level filter for the tracing subscriber.
    ///
    /// Common values are `"info"` (default) and `"debug"` (`--verbose`).
    /// `None` (from `--quiet`) installs no subscriber at all, so only the
    /// commands' own progress text is printed.
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Create a new CLI configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber for this configuration.
    ///
    /// `RUST_LOG` wins over the flag-derived level so targeted filters like
    /// `RUST_LOG=git=trace` keep working. Calling this more than once is
    /// harmless; later installations are ignored.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level.clone())
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Main CLI application structure for srctool.
///
/// Handles global flags and delegates to subcommands for the actual work.
/// Uses the clap derive API, so `--help`, validation, and the mutual
/// exclusion of `--verbose`/`--quiet` come for free.
#[derive(Parser)]
#[command(
    name = "srctool",
    about = "Recipe source maintenance - refresh cached tarballs and pinned git refs",
    version,
    long_about = "srctool keeps a package recipe's upstream declarations in sync: `refresh` \
                  reconciles cached source tarballs and rewrites checksums and version/release \
                  metadata, `pin` updates the pinned commit of an embedded upstream."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging.
    ///
    /// Shows fetch decisions (conditional vs. unconditional), git command
    /// lines, and per-entry diagnostics. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress log output for automation.
    ///
    /// Only the commands' own progress text and errors are printed.
    /// Mutually exclusive with `--verbose`.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the recipe file.
    ///
    /// Defaults to `stone.yaml` in the current directory, matching how
    /// packagers invoke the tool from inside a package checkout.
    #[arg(long, global = true)]
    recipe: Option<PathBuf>,
}

/// Available subcommands for the srctool CLI.
#[derive(Subcommand)]
enum Commands {
    /// Reconcile the recipe's upstream sources.
    ///
    /// Conditionally re-downloads every declared tarball, recomputes
    /// checksums, and - when any checksum changed - stamps the recipe
    /// version with today's date and bumps the release counter.
    ///
    /// See [`refresh::RefreshArgs`] for detailed options and behavior.
    Refresh(refresh::RefreshArgs),

    /// Update the pinned commit of the recipe's embedded upstream.
    ///
    /// Probes the upstream version file for the recipe's version, resolves
    /// the head of the matching release branch with `git ls-remote`, and
    /// splices the result into the recipe's marker-delimited block.
    ///
    /// See [`pin::PinArgs`] for detailed options and behavior.
    Pin(pin::PinArgs),
}

impl Cli {
    /// Execute the CLI with default configuration.
    ///
    /// Builds a [`CliConfig`] from the parsed arguments and delegates to
    /// [`execute_with_config`](Self::execute_with_config).
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed CLI arguments.
    ///
    /// - `--verbose` maps to the "debug" level
    /// - `--quiet` disables logging entirely
    /// - otherwise "info"
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
        }
    }

    /// Execute the CLI with a specific configuration.
    ///
    /// This is the core execution method all entry points call: it installs
    /// the logging subscriber once and dispatches to the subcommand with the
    /// resolved recipe path.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        let recipe_path = self.recipe.unwrap_or_else(|| PathBuf::from(RECIPE_FILENAME));

        match self.command {
            Commands::Refresh(args) => refresh::execute(args, &recipe_path).await,
            Commands::Pin(args) => pin::execute(args, &recipe_path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_maps_to_debug_level() {
        let cli = Cli::parse_from(["srctool", "--verbose", "refresh"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn quiet_disables_logging() {
        let cli = Cli::parse_from(["srctool", "--quiet", "refresh"]);
        assert!(cli.build_config().log_level.is_none());
    }

    #[test]
    fn default_level_is_info() {
        let cli = Cli::parse_from(["srctool", "refresh"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("info"));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["srctool", "--verbose", "--quiet", "refresh"]).is_err());
    }

    #[test]
    fn recipe_flag_is_global() {
        let cli = Cli::parse_from(["srctool", "refresh", "--recipe", "../pkg/stone.yaml"]);
        assert_eq!(cli.recipe.as_deref(), Some(std::path::Path::new("../pkg/stone.yaml")));
    }
}
