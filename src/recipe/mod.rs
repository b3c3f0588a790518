//! Recipe file parsing and targeted rewriting.
//!
//! This module handles the package recipe (`stone.yaml`): a YAML file with
//! top-level `version` (date-stamp string), `release` (integer) and an
//! `upstreams` list of single-key `url -> {hash, unpack}` mappings.
//!
//! # Basic Structure
//!
//! ```yaml
//! name    : example
//! version : '20250812'
//! release : 3
//! upstreams:
//!     - https://example.org/pkg-1.2.tar.xz:
//!         hash: 61f7e1...
//!         unpack: false
//! ```
//!
//! # Reading vs. writing
//!
//! Reading goes through a typed serde model so structural problems fail fast
//! as [`SrctoolError::RecipeInvalid`] before any network activity. Writing is
//! deliberately *not* a serde round-trip: regenerating the file would destroy
//! comments, key alignment and quoting that packagers maintain by hand.
//! Mutation instead happens by targeted text-region replacement on the
//! original file text:
//!
//! - a changed checksum replaces the old digest in place, guarded by the old
//!   digest occurring exactly once;
//! - the `version` and `release` lines are rewritten through anchored line
//!   regexes that keep indentation, colon alignment and quoting;
//! - the pin block is spliced between exact `##@@BEGIN_UPSTREAMS` /
//!   `##@@END_UPSTREAMS` markers, never by free-form regeneration.
//!
//! An unchanged recipe is never written back, so a no-op run leaves the file
//! byte-identical.

use crate::constants::{UPSTREAMS_BEGIN_MARKER, UPSTREAMS_END_MARKER};
use crate::core::SrctoolError;
use crate::reconciler::SourceEntry;
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Typed view of the recipe keys srctool recognizes.
///
/// Everything else in the file is carried through untouched by the
/// text-based rewrite path and is invisible to this model.
#[derive(Debug, Deserialize)]
struct RecipeDoc {
    version: Option<serde_yaml::Value>,
    release: Option<serde_yaml::Value>,
    upstreams: Option<Vec<BTreeMap<String, UpstreamSpec>>>,
}

/// Properties of one declared upstream source.
///
/// `hash` is optional at parse time: pinned git upstreams carry a `ref`
/// instead, and the refresh flow rejects hash-less entries only when it
/// actually needs them.
#[derive(Debug, Deserialize)]
struct UpstreamSpec {
    hash: Option<String>,
    #[serde(default)]
    unpack: bool,
}

/// A loaded recipe: the raw file text plus the parsed model.
///
/// The text is the single source of truth for writes; the model only serves
/// reads ([`Recipe::upstreams`], [`Recipe::version`], [`Recipe::release`]).
#[derive(Debug)]
pub struct Recipe {
    path: PathBuf,
    text: String,
    doc: RecipeDoc,
}

impl Recipe {
    /// Load and validate a recipe file.
    ///
    /// # Errors
    ///
    /// - [`SrctoolError::RecipeNotFound`] when the file does not exist
    /// - [`SrctoolError::RecipeInvalid`] on YAML syntax errors or when an
    ///   upstream entry is not a single-key mapping
    ///
    /// Both are fatal: nothing else runs without a readable recipe.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SrctoolError::RecipeNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: RecipeDoc =
            serde_yaml::from_str(&text).map_err(|e| SrctoolError::RecipeInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        // Upstream entries must be single-key mappings; a multi-key entry is
        // ambiguous about which URL the properties belong to.
        if let Some(upstreams) = &doc.upstreams {
            for entry in upstreams {
                if entry.len() != 1 {
                    return Err(SrctoolError::RecipeInvalid {
                        path: path.to_path_buf(),
                        reason: format!(
                            "upstream entry must be a single url -> properties mapping, \
                             found {} keys",
                            entry.len()
                        ),
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            text,
            doc,
        })
    }

    /// Path this recipe was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file text, including any pending rewrites.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The recipe `version` field rendered as a string.
    ///
    /// YAML may carry the date stamp quoted (string) or bare (integer); both
    /// forms are accepted.
    pub fn version(&self) -> Option<String> {
        match &self.doc.version {
            Some(serde_yaml::Value::String(s)) => Some(s.clone()),
            Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The recipe `release` field, only when it is integer-typed.
    pub fn release(&self) -> Option<i64> {
        match &self.doc.release {
            Some(serde_yaml::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// The declared upstream sources, in recipe order.
    ///
    /// # Errors
    ///
    /// [`SrctoolError::RecipeInvalid`] when the recipe has no `upstreams`
    /// list, or when an entry carries no `hash`; the refresh flow cannot
    /// reconcile either.
    pub fn upstreams(&self) -> Result<Vec<SourceEntry>> {
        let upstreams = self.doc.upstreams.as_ref().ok_or_else(|| {
            SrctoolError::RecipeInvalid {
                path: self.path.clone(),
                reason: "missing or invalid `upstreams` list".to_string(),
            }
        })?;

        upstreams
            .iter()
            .filter_map(|entry| entry.iter().next())
            .map(|(url, spec)| {
                let hash = spec.hash.clone().ok_or_else(|| {
                    anyhow::Error::from(SrctoolError::RecipeInvalid {
                        path: self.path.clone(),
                        reason: format!("upstream entry {url} has no `hash`"),
                    })
                })?;
                Ok(SourceEntry {
                    url: url.clone(),
                    hash,
                    unpack: spec.unpack,
                })
            })
            .collect()
    }

    /// Replace one checksum digest in place.
    ///
    /// # Errors
    ///
    /// [`SrctoolError::HashNotUnique`] unless `old` occurs exactly once in
    /// the file text. Replacing a non-unique digest could corrupt an
    /// unrelated entry.
    pub fn replace_hash(&mut self, old: &str, new: &str) -> Result<()> {
        let count = self.text.matches(old).count();
        if count != 1 {
            return Err(SrctoolError::HashNotUnique {
                hash: old.to_string(),
                count,
            }
            .into());
        }

        self.text = self.text.replacen(old, new, 1);
        Ok(())
    }

    /// Rewrite the `version` line with a new date stamp.
    ///
    /// Indentation, colon alignment and the existing quoting style are
    /// preserved. A recipe without a recognizable version line is left
    /// untouched with a warning.
    pub fn set_version(&mut self, stamp: &str) {
        let re = Regex::new(r#"(?m)^(version\s*:\s*)(['"]?)([^'"\n]*?)(['"]?)[ \t]*$"#)
            .expect("valid version regex");

        if re.is_match(&self.text) {
            self.text = re
                .replace(&self.text, |caps: &regex::Captures<'_>| {
                    format!("{}{}{}{}", &caps[1], &caps[2], stamp, &caps[4])
                })
                .into_owned();
        } else {
            warn!("Recipe has no top-level `version` line; not stamping");
        }
    }

    /// Increment the `release` counter by one.
    ///
    /// Only applies when the field is present and integer-typed; otherwise
    /// the recipe is left untouched with a warning, matching the tool's
    /// best-effort contract.
    pub fn bump_release(&mut self) {
        let Some(current) = self.release() else {
            warn!("Cannot increment `release`: missing or not an integer");
            return;
        };

        let re = Regex::new(r"(?m)^(release\s*:\s*)(\d+)[ \t]*$").expect("valid release regex");
        if re.is_match(&self.text) {
            let next = current + 1;
            self.text =
                re.replace(&self.text, |caps: &regex::Captures<'_>| {
                    format!("{}{next}", &caps[1])
                })
                .into_owned();
        } else {
            warn!("Cannot increment `release`: line not found in recipe text");
        }
    }

    /// Replace the marker-delimited upstreams block.
    ///
    /// `block` must include the markers itself; everything between (and
    /// including) the existing markers is swapped out, text outside the
    /// markers is untouched.
    ///
    /// # Errors
    ///
    /// [`SrctoolError::MarkerNotFound`] when the recipe carries no marker
    /// pair.
    pub fn replace_upstreams_block(&mut self, block: &str) -> Result<()> {
        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(UPSTREAMS_BEGIN_MARKER),
            regex::escape(UPSTREAMS_END_MARKER)
        );
        let re = Regex::new(&pattern).expect("valid marker regex");

        if !re.is_match(&self.text) {
            return Err(SrctoolError::MarkerNotFound {
                begin: UPSTREAMS_BEGIN_MARKER.to_string(),
                end: UPSTREAMS_END_MARKER.to_string(),
            }
            .into());
        }

        self.text = re.replace(&self.text, |_: &regex::Captures<'_>| block.to_string())
            .into_owned();
        Ok(())
    }

    /// Write the (rewritten) recipe text back to disk.
    ///
    /// # Errors
    ///
    /// [`SrctoolError::RecipeWriteFailed`]; callers treat this as aborting
    /// only the rewrite step, the console summary has already been printed.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::write(&self.path, &self.text).await.map_err(|e| {
            SrctoolError::RecipeWriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}
