// src/error.rs

//! Crate-wide error type

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the resolver
///
/// Only mandatory identity computation and explicit configuration problems
/// produce these. Optional probes (reference packs, manifests, per-assembly
/// metadata) degrade to "not found" instead, so metadata failures stay
/// [`MetadataError`](crate::metadata::MetadataError) values inside the
/// closure walk.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O failure on a path the resolver cannot do without
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed input (manifest, version string, identifier)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The runtime implementation directory does not exist
    #[error("Runtime directory not found: {}", .0.display())]
    RuntimeNotFound(PathBuf),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An external tool (e.g. the dotnet host) could not be located
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// An external tool ran but did not succeed
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
