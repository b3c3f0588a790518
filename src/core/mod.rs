//! Core types and error handling for srctool.
//!
//! This module hosts the error machinery shared by every command:
//! [`SrctoolError`] for strongly-typed failure cases, [`ErrorContext`] for
//! user-facing presentation, and [`user_friendly_error`] for turning any
//! `anyhow::Error` into an actionable message at the CLI boundary.

pub mod error;

pub use error::{ErrorContext, SrctoolError, user_friendly_error};
