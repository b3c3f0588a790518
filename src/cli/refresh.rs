//! The `refresh` command: reconcile upstream sources against the recipe.
//!
//! Loads the recipe (fatal if missing or invalid), runs the
//! [`Reconciler`](crate::reconciler::Reconciler) over the declared
//! `upstreams`, prints the per-entry progress and a summary, and - only when
//! at least one checksum changed - rewrites the recipe: changed digests are
//! swapped in place, `version` is stamped with today's date (`%Y%m%d`) and
//! `release` is bumped by one when integer-typed.
//!
//! A failed rewrite is logged and aborts only the rewrite step; the summary
//! has already been printed and the command still exits successfully, in
//! keeping with the best-effort contract.

use crate::constants::{CACHE_ROOT, default_download_root};
use crate::recipe::Recipe;
use crate::reconciler::{ReconcileReport, Reconciler, ReconcilerConfig, SourceEntry};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::error;

/// Command-line arguments for the refresh command.
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Source cache root to check for previously fetched tarballs.
    ///
    /// Laid out as `<root>/<sha256>/<basename>`. Only ever read; the cache
    /// is populated by the build tool itself.
    #[arg(long, default_value = CACHE_ROOT)]
    pub cache_dir: PathBuf,

    /// Scratch directory for in-flight downloads.
    ///
    /// Per-entry subdirectories are created here and removed again once the
    /// entry is reconciled. Defaults to the system temp directory.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Report what would change without rewriting the recipe.
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the refresh command against a recipe file.
pub async fn execute(args: RefreshArgs, recipe_path: &Path) -> Result<()> {
    let mut recipe = Recipe::load(recipe_path).await?;
    let entries = recipe.upstreams()?;

    let reconciler = Reconciler::new(ReconcilerConfig {
        cache_root: args.cache_dir,
        download_root: args.download_dir.unwrap_or_else(default_download_root),
    })?;

    let report = reconciler.reconcile(&entries).await;

    println!("\n{}", "=".repeat(20));
    if !report.changed {
        println!("No changed hashes for sources found");
        println!("{}", "Finished".green());
        return Ok(());
    }

    for (old, new) in changed_pairs(&entries, &report.entries) {
        println!("  {} {} -> {}", "changed".yellow(), old, new);
    }

    if args.dry_run {
        println!("Dry run, not updating {}", recipe_path.display());
        println!("{}", "Finished".green());
        return Ok(());
    }

    println!("Attempting to update {}...", recipe_path.display());

    // A failed rewrite aborts only this step; the summary above already told
    // the packager what changed.
    let stamp = chrono::Local::now().format("%Y%m%d").to_string();
    match apply_rewrite(&mut recipe, &entries, &report, &stamp).await {
        Ok(()) => println!("{} updated successfully.", recipe_path.display()),
        Err(e) => error!("Error writing updated recipe: {e:#}"),
    }

    println!("{}", "Finished".green());
    Ok(())
}

/// Pairs of (declared, freshly computed) checksums for entries that changed.
fn changed_pairs<'a>(
    declared: &'a [SourceEntry],
    updated: &'a [SourceEntry],
) -> Vec<(&'a str, &'a str)> {
    declared
        .iter()
        .zip(updated)
        .filter(|(old, new)| old.hash != new.hash)
        .map(|(old, new)| (old.hash.as_str(), new.hash.as_str()))
        .collect()
}

/// Apply the gated metadata mutation and checksum rewrites, then persist.
///
/// Hashes change digest-for-digest; `version` becomes `stamp`; `release` is
/// incremented when integer-typed. Callers only reach this when the
/// aggregate changed flag is set.
async fn apply_rewrite(
    recipe: &mut Recipe,
    declared: &[SourceEntry],
    report: &ReconcileReport,
    stamp: &str,
) -> Result<()> {
    for (old, new) in changed_pairs(declared, &report.entries) {
        recipe.replace_hash(old, new)?;
    }

    println!("Hashes have changed. Updating version and incrementing release.");
    recipe.set_version(stamp);
    recipe.bump_release();

    recipe.save().await
}
