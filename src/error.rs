// src/error.rs

//! Error types for the packager library
//!
//! Only failures that must stop a run are represented here. Degraded
//! outcomes (a minifier exiting nonzero, brotli failing, a missing VCS
//! field) are logged where they happen and never become an `Error`.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure with the operation that caused it
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Minifier name that has no known calling convention
    #[error("Unsupported minifier '{0}' (expected uglifyjs, yuicompressor or copy)")]
    UnsupportedMinifier(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Packaging failed: {0}")]
    PackagingFailed(String),
}
