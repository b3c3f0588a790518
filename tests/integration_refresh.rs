//! End-to-end tests for `srctool refresh`.
//!
//! Each test builds a sandbox (recipe + cache root + download root in temp
//! directories) and points the binary at a one-shot loopback HTTP responder,
//! covering the fetch outcomes the reconciler distinguishes: fresh 200
//! bodies, 304 not-modified answers, and failures with or without a cached
//! fallback.

mod common;

use assert_cmd::Command;
use common::{OneShotServer, sha256_hex};
use predicates::prelude::*;
use std::path::PathBuf;

struct Sandbox {
    _dir: tempfile::TempDir,
    recipe: PathBuf,
    cache: PathBuf,
    download: PathBuf,
}

impl Sandbox {
    fn new(recipe_text: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let recipe = dir.path().join("stone.yaml");
        let cache = dir.path().join("cache");
        let download = dir.path().join("download");
        std::fs::write(&recipe, recipe_text).unwrap();
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::create_dir_all(&download).unwrap();

        Self {
            _dir: dir,
            recipe,
            cache,
            download,
        }
    }

    /// Seed the read-only cache with a file under `<hash>/<name>`.
    fn seed_cache(&self, hash: &str, name: &str, contents: &[u8]) -> PathBuf {
        let dir = self.cache.join(hash);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("srctool").unwrap();
        cmd.arg("--recipe")
            .arg(&self.recipe)
            .arg("refresh")
            .arg("--cache-dir")
            .arg(&self.cache)
            .arg("--download-dir")
            .arg(&self.download);
        cmd
    }

    fn recipe_text(&self) -> String {
        std::fs::read_to_string(&self.recipe).unwrap()
    }
}

fn recipe_with_upstream(url: &str, hash: &str) -> String {
    format!(
        "\
# test package
version : '20250812'
release : 3
upstreams:
    - {url}:
        hash: {hash}
        unpack: false
"
    )
}

fn today_stamp() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

#[test]
fn fresh_download_with_matching_hash_changes_nothing() {
    let body = b"tarball contents";
    let server = OneShotServer::spawn("HTTP/1.1 200 OK", body);
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, &sha256_hex(body)));
    let before = sandbox.recipe_text();

    sandbox
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("No changed hashes for sources found"));

    // No rewrite at all: byte-identical recipe.
    assert_eq!(sandbox.recipe_text(), before);
    server.into_request();
}

#[test]
fn fresh_download_with_new_hash_updates_recipe_metadata() {
    let body = b"brand new tarball";
    let server = OneShotServer::spawn("HTTP/1.1 200 OK", body);
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, "abc123"));

    sandbox
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("Hash mismatch for a.tar.gz"))
        .stdout(predicate::str::contains("updated successfully"));

    let after = sandbox.recipe_text();
    assert!(after.contains(&format!("hash: {}", sha256_hex(body))));
    assert!(!after.contains("abc123"));
    assert!(after.contains(&format!("version : '{}'", today_stamp())));
    assert!(after.contains("release : 4"));
    server.into_request();
}

#[test]
fn cached_file_turns_the_fetch_conditional() {
    let body = b"cached tarball";
    let hash = sha256_hex(body);

    let server = OneShotServer::spawn("HTTP/1.1 304 Not Modified", b"");
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, &hash));
    sandbox.seed_cache(&hash, "a.tar.gz", body);
    let before = sandbox.recipe_text();

    sandbox
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("File not modified, using cached version."))
        .stdout(predicate::str::contains("No changed hashes for sources found"));

    assert_eq!(sandbox.recipe_text(), before);

    let request = server.into_request();
    assert!(
        request.to_lowercase().contains("if-modified-since:"),
        "expected a conditional fetch, got:\n{request}"
    );
}

#[test]
fn server_error_falls_back_to_matching_cache() {
    let body = b"known good tarball";
    let hash = sha256_hex(body);

    let server = OneShotServer::spawn("HTTP/1.1 500 Internal Server Error", b"");
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, &hash));
    sandbox.seed_cache(&hash, "a.tar.gz", body);
    let before = sandbox.recipe_text();

    sandbox
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("No changed hashes for sources found"));

    assert_eq!(sandbox.recipe_text(), before);
    server.into_request();
}

#[test]
fn transport_error_without_cache_keeps_checksum_unchanged() {
    // Nothing is listening on this port; the fetch fails outright.
    let sandbox = Sandbox::new(&recipe_with_upstream("http://127.0.0.1:1/a.tar.gz", "abc123"));
    let before = sandbox.recipe_text();

    sandbox
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("No changed hashes for sources found"));

    assert_eq!(sandbox.recipe_text(), before);
}

#[test]
fn dry_run_reports_changes_but_never_rewrites() {
    let body = b"new content for dry run";
    let server = OneShotServer::spawn("HTTP/1.1 200 OK", body);
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, "abc123"));
    let before = sandbox.recipe_text();

    sandbox
        .command()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run, not updating"));

    assert_eq!(sandbox.recipe_text(), before);
    server.into_request();
}

#[test]
fn scratch_directories_are_discarded() {
    let body = b"scratch cleanup check";
    let server = OneShotServer::spawn("HTTP/1.1 200 OK", body);
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, "abc123"));

    sandbox.command().assert().success();

    // The per-entry scratch subdir (download/<hash>) must be gone.
    let leftovers: Vec<_> = std::fs::read_dir(&sandbox.download)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "scratch leftovers: {leftovers:?}");
    server.into_request();
}

#[test]
fn missing_recipe_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("stone.yaml");

    Command::cargo_bin("srctool")
        .unwrap()
        .arg("--recipe")
        .arg(&missing)
        .arg("refresh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recipe file not found"));
}

#[test]
fn recipe_without_upstreams_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = dir.path().join("stone.yaml");
    std::fs::write(&recipe, "version: '20250812'\nrelease: 1\n").unwrap();

    Command::cargo_bin("srctool")
        .unwrap()
        .arg("--recipe")
        .arg(&recipe)
        .arg("refresh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("upstreams"));
}

#[test]
fn cache_root_is_never_written() {
    let body = b"fresh body";
    let server = OneShotServer::spawn("HTTP/1.1 200 OK", body);
    let url = format!("{}/a.tar.gz", server.base_url);
    let sandbox = Sandbox::new(&recipe_with_upstream(&url, "abc123"));

    sandbox.command().assert().success();

    // Downloading went through the scratch root only; the cache stays empty.
    let cache_entries: Vec<_> = std::fs::read_dir(&sandbox.cache)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(cache_entries.is_empty(), "cache writes detected: {cache_entries:?}");
    server.into_request();
}
