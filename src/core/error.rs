//! Error handling for srctool
//!
//! This module provides error types and user-friendly error reporting for the
//! recipe maintenance commands. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`SrctoolError`] - Enumerated error types for all fatal failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Taxonomy
//!
//! Fatal errors terminate the run and surface through [`user_friendly_error`]:
//! - **Recipe loading**: [`SrctoolError::RecipeNotFound`],
//!   [`SrctoolError::RecipeInvalid`] - raised before any network activity
//! - **Recipe rewriting**: [`SrctoolError::RecipeWriteFailed`],
//!   [`SrctoolError::HashNotUnique`], [`SrctoolError::MarkerNotFound`] -
//!   abort only the rewrite step; the console summary has already been printed
//! - **Pin resolution**: [`SrctoolError::UpstreamVersionNotFound`],
//!   [`SrctoolError::CommitNotFound`], [`SrctoolError::NetworkError`]
//! - **Git**: [`SrctoolError::GitNotFound`], [`SrctoolError::GitCommandError`]
//!
//! Per-entry fetch and hash failures during reconciliation are deliberately
//! *not* represented here: they degrade to "use the cached copy if available,
//! else leave the checksum unchanged", are logged with `tracing::warn!`, and
//! processing continues with the next entry.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for srctool operations
///
/// Each variant represents a specific fatal failure mode and carries enough
/// context (paths, URLs, stderr output) to produce an actionable message.
/// Recoverable per-entry conditions never reach this enum.
#[derive(Error, Debug)]
pub enum SrctoolError {
    /// The recipe file does not exist at the expected path.
    ///
    /// Raised before any network activity; both commands need to run next to
    /// (or be pointed at) a recipe file.
    #[error("Recipe file not found: {path}")]
    RecipeNotFound {
        /// Path that was checked for the recipe
        path: PathBuf,
    },

    /// The recipe file exists but could not be parsed or fails validation.
    ///
    /// Covers YAML syntax errors as well as structural problems such as a
    /// missing `upstreams` list or an upstream entry that is not a single-key
    /// mapping.
    #[error("Invalid recipe {path}: {reason}")]
    RecipeInvalid {
        /// Path of the offending recipe
        path: PathBuf,
        /// Human-readable description of what was wrong
        reason: String,
    },

    /// Writing the updated recipe back to disk failed.
    ///
    /// Only the rewrite step is aborted; the reconciliation summary has
    /// already been emitted by the time this is raised.
    #[error("Failed to write updated recipe {path}: {reason}")]
    RecipeWriteFailed {
        /// Path of the recipe being rewritten
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// A checksum slated for replacement does not occur exactly once in the
    /// recipe text.
    ///
    /// Targeted text replacement is only safe when the old digest is unique;
    /// zero or multiple occurrences abort the rewrite rather than guessing.
    #[error("Checksum {hash} occurs {count} times in the recipe, expected exactly once")]
    HashNotUnique {
        /// The digest that was searched for
        hash: String,
        /// Number of occurrences found
        count: usize,
    },

    /// The marker-delimited upstreams block was not found in the recipe.
    #[error("Recipe has no {begin} .. {end} marker block")]
    MarkerNotFound {
        /// Expected opening marker
        begin: String,
        /// Expected closing marker
        end: String,
    },

    /// Git executable not found on the system
    #[error("Git command not found - please install git")]
    GitNotFound,

    /// Git operation failed during execution
    ///
    /// This error occurs when a git command returns a non-zero exit code or
    /// times out. Common causes include network issues or an unreachable
    /// remote.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "ls-remote")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// An HTTP request that the command cannot proceed without failed.
    ///
    /// Only the pin command treats network failures as fatal; the refresh
    /// command degrades to cached content instead.
    #[error("Network request failed for {url}: {reason}")]
    NetworkError {
        /// URL that was being fetched
        url: String,
        /// Transport or status failure description
        reason: String,
    },

    /// The upstream version file did not contain a recognizable version.
    #[error("No upstream version found in {url}")]
    UpstreamVersionNotFound {
        /// Version file that was probed
        url: String,
    },

    /// `git ls-remote` produced no commit id for the release branch.
    #[error("No commit found on {remote} for branch {branch}")]
    CommitNotFound {
        /// Remote that was queried
        remote: String,
        /// Branch name that was looked up
        branch: String,
    },

    /// I/O operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for cases not covered by other variants
    #[error("{message}")]
    Other {
        /// Error description
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`SrctoolError`] and adds optional suggestions for
/// resolution and additional details. This is the primary way srctool
/// presents fatal errors to CLI users.
///
/// # Display Format
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use srctool_cli::core::{ErrorContext, SrctoolError};
///
/// let context = ErrorContext::new(SrctoolError::GitNotFound)
///     .with_suggestion("Install git from your package manager")
///     .with_details("The pin command resolves commits with `git ls-remote`");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying srctool error
    pub error: SrctoolError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`SrctoolError`]
    #[must_use]
    pub const fn new(error: SrctoolError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps that users can take to resolve
    /// the error. They are displayed in green in the terminal.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details provide context about why the error occurred. They are
    /// displayed in yellow, less prominent than the error itself.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// This function is the single conversion point at the CLI boundary: it
/// recognizes [`SrctoolError`] variants (possibly buried under `anyhow`
/// context layers) and pairs them with tailored suggestions; anything else is
/// wrapped as a generic error.
pub fn user_friendly_error(err: anyhow::Error) -> ErrorContext {
    // Walk the chain so context added with `.context()` doesn't hide the
    // typed error underneath.
    for cause in err.chain() {
        if let Some(srctool_err) = cause.downcast_ref::<SrctoolError>() {
            return contextualize(srctool_err);
        }
    }

    ErrorContext::new(SrctoolError::Other {
        message: format!("{err:#}"),
    })
}

fn contextualize(err: &SrctoolError) -> ErrorContext {
    let rebuilt = match err {
        SrctoolError::RecipeNotFound { path } => {
            return ErrorContext::new(SrctoolError::RecipeNotFound {
                path: path.clone(),
            })
            .with_details("srctool must be run in the same directory as a recipe file")
            .with_suggestion(format!(
                "Change into the package directory or pass --recipe {}",
                path.display()
            ));
        }
        SrctoolError::RecipeInvalid { path, reason } => {
            return ErrorContext::new(SrctoolError::RecipeInvalid {
                path: path.clone(),
                reason: reason.clone(),
            })
            .with_details(
                "Expected top-level `version`, `release` and an `upstreams` list of \
                 url -> {hash, unpack} mappings",
            )
            .with_suggestion("Fix the recipe YAML and re-run");
        }
        SrctoolError::GitNotFound => {
            return ErrorContext::new(SrctoolError::GitNotFound)
                .with_suggestion("Install git from your package manager");
        }
        SrctoolError::GitCommandError { operation, stderr } => {
            return ErrorContext::new(SrctoolError::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            })
            .with_details(stderr.trim().to_string())
            .with_suggestion("Check network connectivity and that the remote is reachable");
        }
        SrctoolError::NetworkError { url, reason } => {
            return ErrorContext::new(SrctoolError::NetworkError {
                url: url.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("Check your internet connection and retry");
        }
        SrctoolError::HashNotUnique { hash, count } => {
            return ErrorContext::new(SrctoolError::HashNotUnique {
                hash: hash.clone(),
                count: *count,
            })
            .with_details(
                "Checksums are rewritten by exact text replacement, which is only \
                 safe when the old digest appears exactly once",
            )
            .with_suggestion("Update the duplicated checksum manually");
        }
        SrctoolError::MarkerNotFound { begin, end } => {
            return ErrorContext::new(SrctoolError::MarkerNotFound {
                begin: begin.clone(),
                end: end.clone(),
            })
            .with_suggestion(format!(
                "Wrap the managed upstreams section in `{begin}` and `{end}` comment lines"
            ));
        }
        SrctoolError::RecipeWriteFailed { path, reason } => SrctoolError::RecipeWriteFailed {
            path: path.clone(),
            reason: reason.clone(),
        },
        SrctoolError::UpstreamVersionNotFound { url } => SrctoolError::UpstreamVersionNotFound {
            url: url.clone(),
        },
        SrctoolError::CommitNotFound { remote, branch } => SrctoolError::CommitNotFound {
            remote: remote.clone(),
            branch: branch.clone(),
        },
        SrctoolError::IoError(e) => SrctoolError::Other {
            message: format!("IO error: {e}"),
        },
        SrctoolError::Other { message } => SrctoolError::Other {
            message: message.clone(),
        },
    };

    ErrorContext::new(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_not_found_gets_suggestion() {
        let err = anyhow::Error::new(SrctoolError::RecipeNotFound {
            path: PathBuf::from("stone.yaml"),
        });
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.is_some());
        assert!(ctx.to_string().contains("stone.yaml"));
    }

    #[test]
    fn typed_error_survives_anyhow_context() {
        use anyhow::Context;

        let result: anyhow::Result<()> = Err(SrctoolError::GitNotFound.into());
        let err = result.context("while resolving the pinned commit").unwrap_err();
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, SrctoolError::GitNotFound));
    }

    #[test]
    fn unknown_error_becomes_other() {
        let ctx = user_friendly_error(anyhow::anyhow!("something odd"));
        match ctx.error {
            SrctoolError::Other { message } => assert!(message.contains("something odd")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn display_includes_details_and_suggestion() {
        let ctx = ErrorContext::new(SrctoolError::GitNotFound)
            .with_details("needed for ls-remote")
            .with_suggestion("install git");
        let rendered = ctx.to_string();
        assert!(rendered.contains("Details: needed for ls-remote"));
        assert!(rendered.contains("Suggestion: install git"));
    }
}
