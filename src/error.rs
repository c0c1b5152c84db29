//! Error types for the parts of the library that can fail with a reason.
//!
//! Most of the matching machinery degrades instead of failing (see
//! [`FcResult`](crate::FcResult)); only cache blobs and configuration files
//! have failure modes worth reporting to the caller.

use thiserror::Error;

/// Reasons why a serialized cache blob was rejected.
#[derive(Debug, Error)]
pub enum FcCacheError {
    #[error("cache blob is too short ({0} bytes)")]
    Truncated(usize),
    #[error("bad cache magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported cache version {0}")]
    BadVersion(u32),
    #[error("cache header declares {declared} bytes, blob has {actual}")]
    SizeMismatch { declared: usize, actual: usize },
    #[error("offset {offset:#x} out of bounds while reading {what}")]
    BadOffset { what: &'static str, offset: usize },
    #[error("cache contains an invalid value tag {0}")]
    BadValueTag(u32),
    #[error("cache contains invalid utf-8 in {0}")]
    BadString(&'static str),
    #[error("cache is stale for {0}")]
    Stale(String),
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons why a configuration document could not be loaded.
#[derive(Debug, Error)]
pub enum FcConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config XML: {0}")]
    Xml(#[from] xmlparser::Error),
    #[error("unbalanced element <{0}>")]
    Unbalanced(String),
}
