// src/metadata/version_info.rs

//! Four-part file versions from PE version resources

use goblin::pe::PE;
use goblin::pe::resource::VS_FFI_SIGNATURE;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// major.minor.build.revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl FileVersion {
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a dotted quadruple such as `4.8.3815.0`
    ///
    /// Missing trailing parts count as zero; anything non-numeric or more
    /// than four parts is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = [0u16; 4];
        let mut count = 0;
        for piece in s.trim().split('.') {
            if count == 4 {
                return None;
            }
            parts[count] = piece.parse().ok()?;
            count += 1;
        }
        Some(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }

    fn from_words(ms: u32, ls: u32) -> Self {
        Self::new(
            (ms >> 16) as u16,
            (ms & 0xFFFF) as u16,
            (ls >> 16) as u16,
            (ls & 0xFFFF) as u16,
        )
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// File version from the `RT_VERSION` resource of the PE image in `bytes`
///
/// Non-PE input, images without a version resource and blocks with a bad
/// signature all yield `None`.
pub fn parse_file_version(bytes: &[u8]) -> Option<FileVersion> {
    let pe = match PE::parse(bytes) {
        Ok(pe) => pe,
        Err(e) => {
            debug!("Not a PE image: {}", e);
            return None;
        }
    };

    let fixed = pe.resource_data?.version_info?.fixed_info?;
    if fixed.signature != VS_FFI_SIGNATURE {
        debug!("Bad VS_FIXEDFILEINFO signature {:#x}", fixed.signature);
        return None;
    }
    Some(FileVersion::from_words(
        fixed.file_version_ms,
        fixed.file_version_ls,
    ))
}

/// File version of the binary at `path`, if it carries one
pub fn read_file_version(path: &Path) -> Option<FileVersion> {
    match fs::read(path) {
        Ok(bytes) => parse_file_version(&bytes),
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            None
        }
    }
}
