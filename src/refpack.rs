// src/refpack.rs

//! Reference pack lookup
//!
//! SDK installs ship reference-only assemblies next to the shared runtime:
//!
//! ```text
//! <dotnet>/shared/Microsoft.NETCore.App/<version>/        runtime dir
//! <dotnet>/packs/Microsoft.NETCore.App.Ref/<version>/ref/<tfm>/
//! ```
//!
//! When the pack for the running version exists, its directory listing is
//! the reference set and no closure walk is needed.

use crate::runtime::{REFERENCE_PACK_PACKAGE, RuntimeEnvironment, ancestor};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CORE_MONIKER_PREFIX: &str = "netcoreapp";
/// net5.0 and later drop the `coreapp` part
const NET_MONIKER_PREFIX: &str = "net";

pub struct ReferencePackLocator;

impl ReferencePackLocator {
    /// `<runtime dir>/../../../packs/Microsoft.NETCore.App.Ref`
    pub fn root(runtime_dir: &Path) -> PathBuf {
        ancestor(runtime_dir, 3)
            .join("packs")
            .join(REFERENCE_PACK_PACKAGE)
    }

    /// Pack root, only when it exists
    pub fn existing_root(runtime_dir: &Path) -> Option<PathBuf> {
        let root = Self::root(runtime_dir);
        root.is_dir().then_some(root)
    }

    /// Reference directory matching the environment's runtime version
    pub fn locate(env: &RuntimeEnvironment) -> Option<PathBuf> {
        Self::locate_in(env.runtime_dir(), env.runtime_version())
    }

    pub fn locate_in(runtime_dir: &Path, runtime_version: &str) -> Option<PathBuf> {
        let Some(root) = Self::existing_root(runtime_dir) else {
            debug!("No reference pack root for {}", runtime_dir.display());
            return None;
        };

        let ref_dir = root.join(runtime_version).join("ref");
        let mut names: Vec<String> = match fs::read_dir(&ref_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                debug!("Cannot list {}: {}", ref_dir.display(), e);
                return None;
            }
        };
        // read_dir order is unspecified
        names.sort();

        let selected = Self::select(&names)?;
        debug!("Selected reference pack {}", selected);
        Some(ref_dir.join(selected))
    }

    /// Highest `netcoreappX.Y` (or `netX.Y`) name; unparseable names rank
    /// lowest and the earliest name wins a tie
    pub fn select(names: &[String]) -> Option<&str> {
        let mut best: Option<(&str, Option<f64>)> = None;
        for name in names {
            let version = Self::parse_pack_version(name);
            let better = match best {
                None => true,
                Some((_, current)) => compare_versions(version, current) == Ordering::Greater,
            };
            if better {
                best = Some((name.as_str(), version));
            }
        }
        best.map(|(name, _)| name)
    }

    /// Numeric version of a target directory name
    pub fn parse_pack_version(name: &str) -> Option<f64> {
        if let Some(rest) = name.strip_prefix(CORE_MONIKER_PREFIX) {
            return parse_numeric(rest);
        }
        // netX.Y only; a bare netXY would be a desktop moniker
        let rest = name.strip_prefix(NET_MONIKER_PREFIX)?;
        if !rest.contains('.') {
            return None;
        }
        parse_numeric(rest)
    }

    /// Whether `path` lives somewhere under the pack root of `runtime_dir`
    pub fn is_under_reference_pack_directory(runtime_dir: &Path, path: &Path) -> bool {
        let Some(root) = Self::existing_root(runtime_dir) else {
            return false;
        };
        let Some(parent) = path.parent() else {
            return false;
        };
        let root = root.to_string_lossy().to_lowercase();
        parent.to_string_lossy().to_lowercase().starts_with(&root)
    }
}

/// Digits and dots only, so `inf` and `NaN` never rank
fn parse_numeric(text: &str) -> Option<f64> {
    if !text.starts_with(|c: char| c.is_ascii_digit())
        || !text.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    text.parse().ok()
}

fn compare_versions(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
