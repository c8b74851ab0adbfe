// src/host.rs

//! Process and OS introspection
//!
//! Everything the resolver needs to know about the machine it runs on goes
//! through [`HostEnvironment`], so identity inference can be driven by a
//! synthetic host in tests. [`SystemHost`] is the real implementation.

use crate::runtime::CORE_RUNTIME_PACKAGE;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsPlatform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl OsPlatform {
    /// Platform of the running process
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }
}

/// Architecture of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessArch {
    X64,
    X86,
    Arm64,
    Arm,
    Other,
}

impl ProcessArch {
    /// Architecture of the running process
    pub fn current() -> Self {
        Self::from_arch_name(std::env::consts::ARCH)
    }

    /// Map a `std::env::consts::ARCH` style name
    pub fn from_arch_name(name: &str) -> Self {
        match name {
            "x86_64" => Self::X64,
            "x86" => Self::X86,
            "aarch64" => Self::Arm64,
            "arm" => Self::Arm,
            _ => Self::Other,
        }
    }
}

/// Which runtime family hosts the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeFlavor {
    /// Modern cross-platform runtime (shared framework layout)
    Core,
    /// Legacy desktop framework
    Desktop,
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Desktop => write!(f, "desktop"),
        }
    }
}

/// Introspection capability consumed by the resolver
pub trait HostEnvironment {
    /// Current OS family
    fn os_platform(&self) -> OsPlatform;

    /// Current process architecture
    fn process_arch(&self) -> ProcessArch;

    /// Runtime family the toolchain executes on
    fn runtime_flavor(&self) -> RuntimeFlavor;

    /// Directory containing the active runtime's implementation binaries,
    /// if it can be determined
    fn implementation_dir(&self) -> Option<PathBuf>;

    /// Installation directory of the toolchain itself
    fn toolchain_dir(&self) -> PathBuf;

    /// Path of the entry binary of the host process
    fn entry_binary(&self) -> Option<PathBuf>;

    /// Location of a value tuple assembly already loaded by the host process
    fn loaded_value_tuple(&self) -> Option<PathBuf> {
        None
    }
}

/// Host implementation backed by the real machine
#[derive(Debug, Clone)]
pub struct SystemHost {
    flavor: RuntimeFlavor,
    implementation_dir: Option<PathBuf>,
    toolchain_dir: PathBuf,
}

impl SystemHost {
    /// Probe the machine for an installed runtime
    ///
    /// A modern shared runtime wins when one is installed. On Windows the
    /// desktop framework directory is used otherwise.
    pub fn detect(toolchain_dir: Option<PathBuf>) -> Self {
        let toolchain_dir = toolchain_dir
            .or_else(current_exe_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(dir) = dotnet_root().and_then(|root| newest_shared_runtime(&root)) {
            debug!("Detected shared runtime at {}", dir.display());
            return Self {
                flavor: RuntimeFlavor::Core,
                implementation_dir: Some(dir),
                toolchain_dir,
            };
        }

        if let Some(dir) = desktop_framework_dir() {
            debug!("Detected desktop framework at {}", dir.display());
            return Self {
                flavor: RuntimeFlavor::Desktop,
                implementation_dir: Some(dir),
                toolchain_dir,
            };
        }

        debug!("No installed runtime detected");
        Self {
            flavor: RuntimeFlavor::Core,
            implementation_dir: None,
            toolchain_dir,
        }
    }
}

impl HostEnvironment for SystemHost {
    fn os_platform(&self) -> OsPlatform {
        OsPlatform::current()
    }

    fn process_arch(&self) -> ProcessArch {
        ProcessArch::current()
    }

    fn runtime_flavor(&self) -> RuntimeFlavor {
        self.flavor
    }

    fn implementation_dir(&self) -> Option<PathBuf> {
        self.implementation_dir.clone()
    }

    fn toolchain_dir(&self) -> PathBuf {
        self.toolchain_dir.clone()
    }

    fn entry_binary(&self) -> Option<PathBuf> {
        std::env::current_exe().ok()
    }
}

fn current_exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Root of the dotnet installation (`DOTNET_ROOT`, else the `dotnet` on PATH)
pub(crate) fn dotnet_root() -> Option<PathBuf> {
    if let Ok(root) = std::env::var("DOTNET_ROOT") {
        let root = PathBuf::from(root);
        if root.is_dir() {
            return Some(root);
        }
    }

    let exe = which::which("dotnet").ok()?;
    // /usr/bin/dotnet is usually a symlink into the real install
    let exe = fs::canonicalize(&exe).unwrap_or(exe);
    exe.parent().map(Path::to_path_buf)
}

/// Highest versioned directory under `<root>/shared/Microsoft.NETCore.App`
pub(crate) fn newest_shared_runtime(root: &Path) -> Option<PathBuf> {
    let shared = root.join("shared").join(CORE_RUNTIME_PACKAGE);
    let entries = fs::read_dir(&shared).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            semver::Version::parse(&name)
                .ok()
                .map(|version| (version, entry.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}

fn desktop_framework_dir() -> Option<PathBuf> {
    if !cfg!(windows) {
        return None;
    }

    let windir = PathBuf::from(std::env::var("WINDIR").ok()?);
    let framework = if cfg!(target_pointer_width = "64") {
        "Framework64"
    } else {
        "Framework"
    };
    let dir = windir
        .join("Microsoft.NET")
        .join(framework)
        .join("v4.0.30319");
    dir.is_dir().then_some(dir)
}
