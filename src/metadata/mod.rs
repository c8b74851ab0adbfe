// src/metadata/mod.rs

//! Assembly metadata reading
//!
//! The closure walk only needs one thing from a binary: the simple names of
//! the assemblies it references. [`MetadataReader`] is that capability;
//! [`ClrMetadataReader`] implements it over real PE files.

mod clr;
mod error;
mod version_info;

pub use clr::{ClrMetadataReader, parse_metadata};
pub use error::MetadataError;
pub use version_info::{FileVersion, parse_file_version, read_file_version};

use std::path::Path;

/// How much of a module to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Only decode outbound references, skip the module's own identity
    pub minimal: bool,
}

impl ReadOptions {
    /// Read-only, references only
    pub fn minimal() -> Self {
        Self { minimal: true }
    }

    pub fn full() -> Self {
        Self { minimal: false }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::minimal()
    }
}

/// An opened module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleHandle {
    assembly_name: Option<String>,
    references: Vec<String>,
}

impl ModuleHandle {
    pub fn new(assembly_name: Option<String>, references: Vec<String>) -> Self {
        Self {
            assembly_name,
            references,
        }
    }

    /// The module's own simple name (not decoded in minimal mode)
    pub fn assembly_name(&self) -> Option<&str> {
        self.assembly_name.as_deref()
    }

    /// Simple names of referenced assemblies, in table order
    pub fn outbound_references(&self) -> &[String] {
        &self.references
    }
}

/// Capability to open a binary and list the assemblies it references
pub trait MetadataReader {
    fn open(&self, path: &Path, options: ReadOptions) -> Result<ModuleHandle, MetadataError>;
}

impl<R: MetadataReader + ?Sized> MetadataReader for &R {
    fn open(&self, path: &Path, options: ReadOptions) -> Result<ModuleHandle, MetadataError> {
        (**self).open(path, options)
    }
}
