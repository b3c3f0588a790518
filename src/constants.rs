//! Global constants used throughout the srctool codebase.
//!
//! This module contains the filesystem roots, default recipe filename,
//! timeout durations, and pin-command defaults that are used across
//! multiple modules. Defining them centrally improves maintainability
//! and makes magic values more discoverable.

use std::path::PathBuf;
use std::time::Duration;

/// Default recipe filename looked up in the working directory.
pub const RECIPE_FILENAME: &str = "stone.yaml";

/// Root of the build tool's source cache.
///
/// Laid out as `<root>/<sha256>/<basename>`; one directory per known
/// checksum. The refresh flow only ever reads from this tree - population
/// happens when the build tool fetches sources itself.
pub const CACHE_ROOT: &str = "/var/lib/solbuild/sources";

/// Scratch root for in-flight downloads.
///
/// Per-entry subdirectories (`<root>/<sha256>/`) are created before a fetch
/// and removed again once the entry has been reconciled, whatever the
/// outcome.
pub fn default_download_root() -> PathBuf {
    std::env::temp_dir()
}

/// Timeout for a single upstream HTTP request (30 seconds).
///
/// Each fetch blocks the run until it completes or hits this limit; there
/// is no retry beyond the one conditional attempt.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for `git ls-remote` against the pin remote (60 seconds).
///
/// Prevents a hung network connection from blocking the pin command
/// indefinitely.
pub const GIT_LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// Write buffer size for streaming downloads to disk (8 KiB).
pub const DOWNLOAD_BUFFER_SIZE: usize = 8192;

/// Default version-file URL template for the pin command.
///
/// `{version}` is replaced with the recipe's `version` field. The default
/// points at the qtwebengine tag's CHROMIUM_VERSION file.
pub const PIN_VERSION_URL: &str =
    "https://invent.kde.org/qt/qt/qtwebengine/-/raw/v{version}/CHROMIUM_VERSION";

/// Pattern that extracts the embedded project version from the version file.
pub const PIN_VERSION_PATTERN: &str =
    r"(?:Based on Chromium version: *)([0-9]*\.[0-9]*\.[0-9]*\.[0-9]*)";

/// Default git remote holding the embedded upstream's release branches.
pub const PIN_GIT_REMOTE: &str = "https://invent.kde.org/qt/qt/qtwebengine-chromium.git";

/// Suffix appended to the embedded project's major version to name the
/// release branch queried with `ls-remote` (e.g. `122-based`).
pub const PIN_BRANCH_SUFFIX: &str = "-based";

/// Marker opening the machine-managed upstreams block in the recipe.
pub const UPSTREAMS_BEGIN_MARKER: &str = "##@@BEGIN_UPSTREAMS";

/// Marker closing the machine-managed upstreams block in the recipe.
pub const UPSTREAMS_END_MARKER: &str = "##@@END_UPSTREAMS";
