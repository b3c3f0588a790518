//! The `pin` command: update the pinned commit of an embedded upstream.
//!
//! Reads the recipe `version`, resolves the embedded upstream's release
//! branch head via [`PinConfig::resolve`], and splices the rendered
//! `git|<remote>: ref: <commit>` block between the recipe's
//! `##@@BEGIN_UPSTREAMS` / `##@@END_UPSTREAMS` markers. Unlike `refresh`
//! this command is all-or-nothing: any failed step aborts before the recipe
//! is touched.

use crate::recipe::Recipe;
use crate::refspec::PinConfig;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Command-line arguments for the pin command.
///
/// The defaults track the chromium checkout embedded in qtwebengine; each
/// can be overridden for recipes that vendor a different project with the
/// same branch layout.
#[derive(Parser, Debug)]
pub struct PinArgs {
    /// Git remote holding the embedded upstream's release branches.
    #[arg(long)]
    pub remote: Option<String>,

    /// Version-file URL template; `{version}` expands to the recipe version.
    #[arg(long)]
    pub version_url: Option<String>,

    /// Suffix appended to the embedded major version to form the branch
    /// name (e.g. `-based` -> `122-based`).
    #[arg(long, allow_hyphen_values = true)]
    pub branch_suffix: Option<String>,
}

impl PinArgs {
    fn to_config(&self) -> PinConfig {
        let mut config = PinConfig::default();
        if let Some(remote) = &self.remote {
            config.remote = remote.clone();
        }
        if let Some(version_url) = &self.version_url {
            config.version_url = version_url.clone();
        }
        if let Some(suffix) = &self.branch_suffix {
            config.branch_suffix = suffix.clone();
        }
        config
    }
}

/// Execute the pin command against a recipe file.
pub async fn execute(args: PinArgs, recipe_path: &Path) -> Result<()> {
    let mut recipe = Recipe::load(recipe_path).await?;

    let version = recipe.version().ok_or_else(|| {
        crate::core::SrctoolError::RecipeInvalid {
            path: recipe_path.to_path_buf(),
            reason: "missing `version` field".to_string(),
        }
    })?;
    info!("Recipe version: {version}");

    let config = args.to_config();
    let pin = config.resolve(&version).await?;
    let block = config.render_block(&pin);

    recipe.replace_upstreams_block(&block)?;

    println!("Updating {}", recipe_path.display());
    recipe.save().await?;

    println!("{}", "Success!".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: PinArgs,
    }

    #[test]
    fn defaults_track_the_embedded_chromium() {
        let wrapper = Wrapper::parse_from(["pin"]);
        let config = wrapper.args.to_config();
        assert!(config.remote.contains("qtwebengine-chromium"));
        assert_eq!(config.branch_suffix, "-based");
    }

    #[test]
    fn flags_override_the_defaults() {
        let wrapper = Wrapper::parse_from([
            "pin",
            "--remote",
            "https://example.org/mirror.git",
            "--branch-suffix",
            "-stable",
        ]);
        let config = wrapper.args.to_config();
        assert_eq!(config.remote, "https://example.org/mirror.git");
        assert_eq!(config.branch_suffix, "-stable");
        // Untouched fields keep their defaults
        assert!(config.version_url.contains("{version}"));
    }
}
