//! Supporting utilities for srctool.

pub mod checksum;

pub use checksum::compute_sha256;
