// src/closure.rs

//! Dependency closure over installed implementation binaries
//!
//! When no reference pack exists, the reference set is rebuilt by walking
//! the assembly references of the runtime's own binaries, depth first.
//! The result map doubles as the visited set: a name is recorded before its
//! references are followed, so cycles terminate.

use crate::metadata::{MetadataError, MetadataReader, ReadOptions};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Assemblies that need a companion platform package which is never present
pub const EXCLUDED_FROM_CLOSURE: &[&str] = &[
    "System.Runtime.WindowsRuntime",
    "System.Runtime.WindowsRuntime.UI.Xaml",
];

/// Core library; added as-is, its metadata is never read
pub const CORE_LIBRARY_NAME: &str = "System.Private.CoreLib";

/// Extensions probed, in order, when resolving a bare simple name
const PROBE_EXTENSIONS: &[&str] = &["dll", "exe"];

/// A reference given either as a file path or as a bare simple name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum AssemblyReference {
    Path(PathBuf),
    Name(String),
}

impl AssemblyReference {
    /// Classify `text`: an existing file is a path, anything else a name
    pub fn parse(text: &str) -> Self {
        let path = Path::new(text);
        if path.is_file() {
            Self::Path(path.to_path_buf())
        } else {
            Self::Name(text.to_string())
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for AssemblyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<PathBuf> for AssemblyReference {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for AssemblyReference {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Simple name to resolved path, each name at most once
#[derive(Debug, Clone, Default)]
pub struct DependencyClosure {
    entries: Vec<(String, PathBuf)>,
    index: HashMap<String, usize>,
    case_insensitive: bool,
}

impl DependencyClosure {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            case_insensitive,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Whether two simple names denote the same assembly under this closure's rule
    pub fn same_name(&self, a: &str, b: &str) -> bool {
        self.key(a) == self.key(b)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&self.key(name))
    }

    /// Record `name`; returns false when it was already present
    pub fn insert(&mut self, name: &str, path: PathBuf) -> bool {
        let key = self.key(name);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push((name.to_string(), path));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.index
            .get(&self.key(name))
            .map(|i| self.entries[*i].1.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Simple names in order of first resolution
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Resolved paths in order of first resolution
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(_, path)| path.as_path())
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.entries.into_iter().map(|(_, path)| path).collect()
    }
}

/// Walks assembly references starting from a seed list
pub struct DependencyClosureBuilder<R> {
    runtime_dir: PathBuf,
    reader: R,
    case_insensitive: bool,
}

impl<R: MetadataReader> DependencyClosureBuilder<R> {
    /// Builder resolving bare names against `runtime_dir`
    ///
    /// Name comparison follows the filesystem convention of the build target
    /// (case-insensitive on Windows and macOS).
    pub fn new(runtime_dir: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            reader,
            case_insensitive: cfg!(any(windows, target_os = "macos")),
        }
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    /// Closure of everything reachable from `seeds`
    ///
    /// Unresolvable or unreadable nodes are dropped; the walk itself never fails.
    pub fn build_closure(&self, seeds: &[AssemblyReference]) -> DependencyClosure {
        let mut closure = DependencyClosure::new(self.case_insensitive);
        for seed in seeds {
            self.visit(&mut closure, seed);
        }
        debug!(
            "Closure of {} seeds holds {} assemblies",
            seeds.len(),
            closure.len()
        );
        closure
    }

    /// Simple name and candidate path for a reference
    pub fn resolve(&self, reference: &AssemblyReference) -> (String, PathBuf) {
        match reference {
            AssemblyReference::Path(path) if path.is_file() => {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (name, path.clone())
            }
            AssemblyReference::Path(path) => (path.display().to_string(), path.clone()),
            AssemblyReference::Name(name) => (name.clone(), self.probe(name)),
        }
    }

    /// `<runtime_dir>/<name>`, then with `.dll`, then `.exe`; else the bare path
    fn probe(&self, name: &str) -> PathBuf {
        let bare = self.runtime_dir.join(name);
        if bare.is_file() {
            return bare;
        }
        PROBE_EXTENSIONS
            .iter()
            .map(|ext| self.runtime_dir.join(format!("{}.{}", name, ext)))
            .find(|candidate| candidate.is_file())
            .unwrap_or(bare)
    }

    fn visit(&self, closure: &mut DependencyClosure, reference: &AssemblyReference) {
        let (name, path) = self.resolve(reference);

        if closure.contains(&name) {
            return;
        }
        if !path.is_file() {
            trace!("Dropping unresolved reference {}", reference);
            return;
        }
        if EXCLUDED_FROM_CLOSURE
            .iter()
            .any(|excluded| closure.same_name(&name, excluded))
        {
            trace!("Excluding {}", name);
            return;
        }
        if closure.same_name(&name, CORE_LIBRARY_NAME) {
            closure.insert(&name, path);
            return;
        }

        let module = match self.reader.open(&path, ReadOptions::minimal()) {
            Ok(module) => module,
            Err(e @ (MetadataError::NotManaged { .. } | MetadataError::NotPortableExecutable { .. })) => {
                trace!("Skipping {}: {}", path.display(), e);
                return;
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return;
            }
        };

        trace!("{} -> {}", name, path.display());
        closure.insert(&name, path);

        for outbound in module.outbound_references() {
            self.visit(closure, &AssemblyReference::Name(outbound.clone()));
        }
    }
}
