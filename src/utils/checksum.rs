//! SHA-256 checksum computation for upstream sources.
//!
//! Recipe checksums are bare lowercase hex digests (no algorithm prefix), so
//! the helpers here produce exactly that form. Hash failures are recoverable
//! for callers: the reconciler treats an unreadable file as "no usable
//! content" and leaves the declared checksum alone.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Compute the SHA-256 checksum of a file.
///
/// # Arguments
///
/// * `path` - Path to the file to compute the checksum for
///
/// # Returns
///
/// The lowercase hex-encoded SHA-256 digest, matching the form recipes
/// declare in their `upstreams` entries.
///
/// # Examples
///
/// ```rust,no_run
/// use srctool_cli::utils::compute_sha256;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let digest = compute_sha256(Path::new("pkg-1.2.tar.xz")).await?;
/// println!("sha256 {digest}");
/// # Ok(())
/// # }
/// ```
pub async fn compute_sha256(path: &Path) -> Result<String> {
    debug!("Computing SHA256 checksum for: {:?}", path);

    let contents = fs::read(path)
        .await
        .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let result = hasher.finalize();

    Ok(hex::encode(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn known_digest() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Hello, World!").unwrap();

        let digest = compute_sha256(temp_file.path()).await.unwrap();

        // Known SHA256 of "Hello, World!"
        assert_eq!(digest, "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compute_sha256(&dir.path().join("nope.tar.xz")).await;
        assert!(result.is_err());
    }
}
