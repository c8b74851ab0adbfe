// src/metadata/error.rs
//! Error types for assembly metadata reading

use thiserror::Error;

/// Errors that can occur while opening an assembly's metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    /// I/O error reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not a PE file at all
    #[error("Not a portable executable: '{path}'")]
    NotPortableExecutable { path: String },

    /// A PE file without a CLI header (native library)
    #[error("No managed metadata in '{path}'")]
    NotManaged { path: String },

    /// Metadata present but inconsistent or truncated
    #[error("Malformed metadata in '{path}': {reason}")]
    Malformed { path: String, reason: String },
}
