//! Upstream version probing and pinned-commit resolution for the `pin`
//! command.
//!
//! Some recipes vendor a second project inside the primary upstream (the
//! default configuration tracks the chromium checkout embedded in
//! qtwebengine). The vendored checkout lives on per-major release branches
//! of a mirror repository, and the recipe pins an exact commit of that
//! branch in its marker-delimited upstreams block. Keeping the pin current
//! means:
//!
//! 1. read the recipe `version`,
//! 2. fetch the upstream's version file for that tag over HTTP,
//! 3. extract the embedded project's version with a regex,
//! 4. `git ls-remote` the mirror's `<major><suffix>` branch for its head
//!    commit,
//! 5. splice the rendered block back between the recipe markers.
//!
//! Unlike the refresh flow this is all-or-nothing: a failed fetch, an
//! unrecognizable version file, or an empty ls-remote answer aborts the
//! command before the recipe is touched.

use crate::constants::{
    PIN_BRANCH_SUFFIX, PIN_GIT_REMOTE, PIN_VERSION_PATTERN, PIN_VERSION_URL,
    UPSTREAMS_BEGIN_MARKER, UPSTREAMS_END_MARKER,
};
use crate::core::SrctoolError;
use crate::git::remote_branch_commit;
use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

/// Configuration for resolving an embedded upstream's pinned commit.
///
/// The defaults carry the qtwebengine/chromium values; every field can be
/// overridden from the CLI for recipes that track a different vendored
/// project with the same layout.
#[derive(Debug, Clone)]
pub struct PinConfig {
    /// Version-file URL template; `{version}` expands to the recipe version
    pub version_url: String,
    /// Regex with one capture group extracting the embedded version
    pub version_pattern: String,
    /// Git remote holding the per-major release branches
    pub remote: String,
    /// Suffix appended to the embedded major version to form the branch name
    pub branch_suffix: String,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            version_url: PIN_VERSION_URL.to_string(),
            version_pattern: PIN_VERSION_PATTERN.to_string(),
            remote: PIN_GIT_REMOTE.to_string(),
            branch_suffix: PIN_BRANCH_SUFFIX.to_string(),
        }
    }
}

/// A fully resolved pin: the embedded version and the branch head commit.
#[derive(Debug)]
pub struct ResolvedPin {
    /// Embedded project version extracted from the version file
    pub version: String,
    /// Release branch that was queried
    pub branch: String,
    /// Head commit of that branch on the remote
    pub commit: String,
}

impl PinConfig {
    /// Resolve the pinned commit for a given recipe version.
    ///
    /// Runs the probe + ls-remote sequence; every step is fatal on failure.
    pub async fn resolve(&self, recipe_version: &str) -> Result<ResolvedPin> {
        let url = self.version_url.replace("{version}", recipe_version);
        let body = fetch_version_file(&url).await?;

        let version = extract_version(&self.version_pattern, &body)
            .ok_or_else(|| SrctoolError::UpstreamVersionNotFound {
                url: url.clone(),
            })?;
        let major = version.split('.').next().unwrap_or(&version).to_string();
        info!("Embedded upstream version detected as v{version} (major v{major})");

        let branch = format!("{major}{}", self.branch_suffix);
        let commit = remote_branch_commit(&self.remote, &branch).await?;
        info!("Latest commit for {branch} branch: {commit}");

        Ok(ResolvedPin {
            version,
            branch,
            commit,
        })
    }

    /// Render the replacement marker block for a resolved pin.
    pub fn render_block(&self, pin: &ResolvedPin) -> String {
        format!(
            "{UPSTREAMS_BEGIN_MARKER}\n    - git|{}:\n        ref: {}\n{UPSTREAMS_END_MARKER}",
            self.remote, pin.commit
        )
    }
}

/// Fetch the upstream version file.
///
/// Non-200 answers are fatal here, unlike the refresh flow: there is no
/// cached fallback for a version probe.
async fn fetch_version_file(url: &str) -> Result<String> {
    debug!("Fetching version file from {url}");

    let client = reqwest::Client::builder()
        .timeout(crate::constants::HTTP_TIMEOUT)
        .build()
        .context("Failed to construct HTTP client")?;

    let response = client.get(url).send().await.map_err(|e| SrctoolError::NetworkError {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(SrctoolError::NetworkError {
            url: url.to_string(),
            reason: format!("status {}", response.status()),
        }
        .into());
    }

    let body = response.text().await.map_err(|e| SrctoolError::NetworkError {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(body)
}

/// Pull the embedded version out of the version-file body.
fn extract_version(pattern: &str, body: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_from_documented_format() {
        let body = "Based on Chromium version: 122.0.6261.171 with additional patches\n";
        assert_eq!(
            extract_version(PIN_VERSION_PATTERN, body).as_deref(),
            Some("122.0.6261.171")
        );
    }

    #[test]
    fn no_match_yields_none() {
        assert!(extract_version(PIN_VERSION_PATTERN, "nothing useful here").is_none());
    }

    #[test]
    fn rendered_block_carries_markers_remote_and_commit() {
        let config = PinConfig::default();
        let pin = ResolvedPin {
            version: "122.0.6261.171".to_string(),
            branch: "122-based".to_string(),
            commit: "92f50d1f5a54e5c34e7cb48a2faeda1a82b1ff6d".to_string(),
        };

        let block = config.render_block(&pin);
        assert!(block.starts_with(UPSTREAMS_BEGIN_MARKER));
        assert!(block.ends_with(UPSTREAMS_END_MARKER));
        assert!(block.contains("git|https://invent.kde.org/qt/qt/qtwebengine-chromium.git"));
        assert!(block.contains("ref: 92f50d1f5a54e5c34e7cb48a2faeda1a82b1ff6d"));
    }

    #[test]
    fn version_url_template_expands() {
        let config = PinConfig::default();
        let url = config.version_url.replace("{version}", "6.8.2");
        assert_eq!(
            url,
            "https://invent.kde.org/qt/qt/qtwebengine/-/raw/v6.8.2/CHROMIUM_VERSION"
        );
    }
}
