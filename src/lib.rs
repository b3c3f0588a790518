//! srctool - recipe source maintenance for package builds
//!
//! A small CLI used by packagers to keep a package recipe's upstream
//! declarations in sync with reality. It covers two independent chores:
//!
//! - `srctool refresh` - walk the recipe's `upstreams` list, conditionally
//!   re-download each tarball, recompute its SHA-256, and rewrite the recipe's
//!   checksums plus version/release metadata when anything changed.
//! - `srctool pin` - read the recipe version, look up the matching upstream
//!   version file over HTTP, resolve the head commit of the matching release
//!   branch with `git ls-remote`, and splice the pinned ref into the recipe's
//!   marker-delimited upstreams block.
//!
//! Both commands are sequential, single-invocation, best-effort tools: one
//! broken source never blocks reconciliation of the rest, and the only fatal
//! error before any network activity is a missing or invalid recipe.
//!
//! # Recipe Format
//!
//! The recipe is a YAML file (`stone.yaml`) with the shape:
//!
//! ```yaml
//! version: '20250812'
//! release: 3
//! upstreams:
//!     - https://example.org/pkg-1.2.tar.xz:
//!         hash: 61f7e1...
//!         unpack: false
//! ```
//!
//! # Core Modules
//!
//! - [`cli`] - clap-based command-line interface and subcommand dispatch
//! - [`core`] - error types and user-facing error presentation
//! - [`recipe`] - typed recipe model and targeted, format-preserving rewrites
//! - [`reconciler`] - the source reconciliation workflow behind `refresh`
//! - [`refspec`] - upstream version probing and commit resolution for `pin`
//! - [`git`] - subprocess wrapper around the system `git` command
//! - [`utils`] - checksum helpers
//!
//! # Rewrite Strategy
//!
//! YAML has no formatting-preserving writer in the ecosystem, so the recipe is
//! parsed through a typed serde model for reading but mutated by targeted
//! text-region replacement: checksums are swapped digest-for-digest, the
//! version and release lines are rewritten in place with anchored regexes, and
//! the pin block is spliced between exact `##@@BEGIN_UPSTREAMS` /
//! `##@@END_UPSTREAMS` markers. Unrelated formatting and comments survive
//! untouched, and an unchanged recipe is never rewritten at all.

pub mod cli;
pub mod constants;
pub mod core;
pub mod git;
pub mod recipe;
pub mod reconciler;
pub mod refspec;
pub mod utils;
