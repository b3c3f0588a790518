//! Git command execution for srctool.
//!
//! Like Cargo, srctool shells out to the system `git` binary instead of
//! linking a git library; the only operation the tool needs is `ls-remote`
//! against the pin remote. [`GitCommand`] is a small builder over
//! [`tokio::process::Command`] with captured output, a timeout, and typed
//! errors so a hung or failing remote query surfaces as a
//! [`SrctoolError::GitCommandError`] rather than a raw I/O error.

use crate::constants::GIT_LS_REMOTE_TIMEOUT;
use crate::core::SrctoolError;
use anyhow::{Context, Result};
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Builder for git command execution.
///
/// Commands are created with output capture enabled and a default timeout
/// matching [`GIT_LS_REMOTE_TIMEOUT`]. The builder follows the same shape as
/// a `std::process::Command`, but executes asynchronously and converts
/// failures into [`SrctoolError`] variants.
///
/// # Examples
///
/// ```rust,ignore
/// let output = GitCommand::ls_remote(remote, "122-based").execute().await?;
/// ```
pub struct GitCommand {
    /// Command arguments to pass to git (e.g., ["ls-remote", url, branch])
    args: Vec<String>,

    /// Environment variables to set for the git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for command completion
    timeout_duration: Duration,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            env_vars: Vec::new(),
            timeout_duration: GIT_LS_REMOTE_TIMEOUT,
        }
    }
}

impl GitCommand {
    /// Creates a new git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds multiple arguments to the git command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the git command execution.
    ///
    /// Useful for forcing locale-stable output (`LC_ALL=C`) so parsing does
    /// not depend on the user's environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Overrides the execution timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Create an `ls-remote` command querying a single reference on a remote.
    pub fn ls_remote(url: &str, reference: &str) -> Self {
        Self::new().args(["ls-remote", url, reference]).env("LC_ALL", "C")
    }

    /// Execute the command and return the captured output.
    ///
    /// # Errors
    ///
    /// - [`SrctoolError::GitNotFound`] if the `git` binary cannot be spawned
    /// - [`SrctoolError::GitCommandError`] on non-zero exit or timeout
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(&self.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        tracing::debug!(target: "git", "Executing command: git {}", self.args.join(" "));

        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());

        let output = match timeout(self.timeout_duration, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SrctoolError::GitNotFound.into());
            }
            Ok(Err(e)) => {
                return Err(e).context(format!("Failed to execute git {}", self.args.join(" ")));
            }
            Err(_) => {
                tracing::warn!(
                    target: "git",
                    "Command timed out after {} seconds: git {}",
                    self.timeout_duration.as_secs(),
                    self.args.join(" ")
                );
                return Err(SrctoolError::GitCommandError {
                    operation,
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate network \
                         connectivity issues or an unreachable remote.",
                        self.timeout_duration.as_secs()
                    ),
                }
                .into());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(
                target: "git",
                "Command failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
            return Err(SrctoolError::GitCommandError {
                operation,
                stderr,
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !stdout.is_empty() {
            tracing::debug!(target: "git", "{}", stdout.trim());
        }

        Ok(GitCommandOutput {
            stdout,
        })
    }

    /// Execute the command and return only stdout as a trimmed string.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }
}

/// Output from a git command
pub struct GitCommandOutput {
    /// Standard output from the git command
    pub stdout: String,
}

/// Resolve the head commit of a branch on a remote via `git ls-remote`.
///
/// The ls-remote output is `<sha>\t<refname>` per matching reference; the
/// leading 40-hex token of the first line is the commit id.
///
/// # Errors
///
/// Returns [`SrctoolError::CommitNotFound`] when the remote reports no
/// matching reference, in addition to the execution errors of
/// [`GitCommand::execute`].
pub async fn remote_branch_commit(remote: &str, branch: &str) -> Result<String> {
    let stdout = GitCommand::ls_remote(remote, branch).execute_stdout().await?;

    let commit_re = Regex::new(r"^([a-f0-9]{40})").expect("valid commit regex");
    match commit_re.captures(&stdout).and_then(|c| c.get(1)) {
        Some(m) => Ok(m.as_str().to_string()),
        None => Err(SrctoolError::CommitNotFound {
            remote: remote.to_string(),
            branch: branch.to_string(),
        }
        .into()),
    }
}
