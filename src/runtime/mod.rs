// src/runtime/mod.rs

//! Runtime location and the cached runtime identity
//!
//! [`RuntimeLocator`] finds the implementation directory of the active
//! runtime. [`RuntimeEnvironment`] bundles that directory with the version,
//! target framework moniker and platform identifier, computed once.

pub mod manifest;

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::framework::TargetFrameworkResolver;
use crate::host::{HostEnvironment, RuntimeFlavor};
use crate::platform::PlatformIdentifierResolver;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Shared framework package holding the runtime implementation binaries
pub const CORE_RUNTIME_PACKAGE: &str = "Microsoft.NETCore.App";

/// Targeting pack holding reference-only assemblies
pub const REFERENCE_PACK_PACKAGE: &str = "Microsoft.NETCore.App.Ref";

/// Walk `levels` directories up, lexically
///
/// Falls back to appending `..` when the path runs out of components.
pub(crate) fn ancestor(path: &Path, levels: usize) -> PathBuf {
    match path.ancestors().nth(levels) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => {
            let mut up = path.to_path_buf();
            for _ in 0..levels {
                up.push("..");
            }
            up
        }
    }
}

/// Locates the runtime implementation directory and its version
pub struct RuntimeLocator;

impl RuntimeLocator {
    /// Find the runtime directory and version
    ///
    /// With an explicit SDK root the runtime is derived from the SDK's
    /// runtime config; a missing derived directory is fatal. Without one,
    /// the host's implementation directory is used (or the toolchain
    /// directory when the host cannot tell) and the version is the
    /// directory's own name.
    pub fn locate<H: HostEnvironment + ?Sized>(
        host: &H,
        sdk_root: Option<&Path>,
    ) -> Result<(PathBuf, String)> {
        match sdk_root {
            Some(sdk_root) => Self::locate_from_sdk(sdk_root),
            None => Self::locate_from_host(host),
        }
    }

    fn locate_from_sdk(sdk_root: &Path) -> Result<(PathBuf, String)> {
        let version = manifest::read_sdk_field(sdk_root, "version").ok_or_else(|| {
            Error::ParseError(format!(
                "No runtime version in {}",
                manifest::sdk_manifest_path(sdk_root).display()
            ))
        })?;

        let runtime_dir = ancestor(sdk_root, 2)
            .join("shared")
            .join(CORE_RUNTIME_PACKAGE)
            .join(&version);

        if !runtime_dir.is_dir() {
            return Err(Error::RuntimeNotFound(runtime_dir));
        }

        debug!(
            "Runtime {} located from SDK at {}",
            version,
            sdk_root.display()
        );
        Ok((runtime_dir, version))
    }

    fn locate_from_host<H: HostEnvironment + ?Sized>(host: &H) -> Result<(PathBuf, String)> {
        let runtime_dir = host
            .implementation_dir()
            .unwrap_or_else(|| host.toolchain_dir());

        if !runtime_dir.is_dir() {
            return Err(Error::RuntimeNotFound(runtime_dir));
        }

        let version = runtime_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| runtime_dir.display().to_string());

        Ok((runtime_dir, version))
    }
}

/// Identity of the runtime the resolver works against
///
/// Computed once when a resolver is constructed and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEnvironment {
    sdk_root: Option<PathBuf>,
    runtime_dir: PathBuf,
    runtime_version: String,
    flavor: RuntimeFlavor,
    rid: String,
    tfm: String,
}

impl RuntimeEnvironment {
    /// Establish the runtime identity for `host`
    pub fn detect<H: HostEnvironment + ?Sized>(host: &H, config: &ResolverConfig) -> Result<Self> {
        let sdk_root = config.sdk_root.clone();
        let (runtime_dir, runtime_version) = RuntimeLocator::locate(host, sdk_root.as_deref())?;

        let tfm = TargetFrameworkResolver::resolve(host, sdk_root.as_deref(), &runtime_dir);
        let rid = PlatformIdentifierResolver::resolve(host, config.rid.as_deref());

        info!(
            "Runtime {} ({}) at {}, tfm={}, rid={}",
            runtime_version,
            host.runtime_flavor(),
            runtime_dir.display(),
            tfm,
            rid
        );

        Ok(Self {
            sdk_root,
            runtime_dir,
            runtime_version,
            flavor: host.runtime_flavor(),
            rid,
            tfm,
        })
    }

    pub fn sdk_root(&self) -> Option<&Path> {
        self.sdk_root.as_deref()
    }

    /// Directory holding the runtime implementation binaries
    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn flavor(&self) -> RuntimeFlavor {
        self.flavor
    }

    /// Platform identifier, e.g. `linux-x64`
    pub fn rid(&self) -> &str {
        &self.rid
    }

    /// Target framework moniker, e.g. `netcoreapp3.1`
    pub fn tfm(&self) -> &str {
        &self.tfm
    }
}
