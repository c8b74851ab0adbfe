// src/framework/mod.rs

//! Target framework moniker (TFM) inference
//!
//! Signals are tried in priority order:
//! 1. the SDK runtime config, when an SDK root is known
//! 2. the entry binary's dependency manifest
//! 3. a fixed fallback on a modern runtime
//! 4. the desktop core library's file version, looked up in [`monikers::DESKTOP_MONIKERS`]

pub mod monikers;

use crate::host::{HostEnvironment, RuntimeFlavor};
use crate::metadata::read_file_version;
use crate::runtime::manifest;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Core-runtime target name prefix inside a dependency manifest
pub const CORE_RUNTIME_TARGET_PREFIX: &str = ".NETCoreApp,Version=v";

/// Desktop core library whose file version identifies the framework release
pub const DESKTOP_CORE_LIBRARY_FILE: &str = "mscorlib.dll";

/// Infers the target framework moniker
pub struct TargetFrameworkResolver;

impl TargetFrameworkResolver {
    pub fn resolve<H: HostEnvironment + ?Sized>(
        host: &H,
        sdk_root: Option<&Path>,
        runtime_dir: &Path,
    ) -> String {
        if let Some(tfm) = sdk_root.and_then(Self::from_sdk_manifest) {
            debug!("TFM {} from SDK manifest", tfm);
            return tfm;
        }

        if let Some(tfm) = host.entry_binary().and_then(|entry| Self::from_deps_manifest(&entry)) {
            debug!("TFM {} from dependency manifest", tfm);
            return tfm;
        }

        match host.runtime_flavor() {
            RuntimeFlavor::Core => {
                debug!("No manifest found, using {}", monikers::FALLBACK_CORE_MONIKER);
                monikers::FALLBACK_CORE_MONIKER.to_string()
            }
            RuntimeFlavor::Desktop => Self::from_desktop_corelib(runtime_dir).to_string(),
        }
    }

    fn from_sdk_manifest(sdk_root: &Path) -> Option<String> {
        manifest::read_sdk_field(sdk_root, "tfm")
    }

    fn from_deps_manifest(entry_binary: &Path) -> Option<String> {
        let path = manifest::deps_manifest_path(entry_binary);
        let text = fs::read_to_string(&path).ok()?;
        manifest::extract_after_prefix(&text, CORE_RUNTIME_TARGET_PREFIX)
            .map(|version| format!("netcoreapp{}", version))
    }

    fn from_desktop_corelib(runtime_dir: &Path) -> &'static str {
        let corelib = runtime_dir.join(DESKTOP_CORE_LIBRARY_FILE);
        let version = read_file_version(&corelib).unwrap_or_else(|| {
            debug!(
                "No file version in {}, assuming {}",
                corelib.display(),
                monikers::DEFAULT_CORELIB_VERSION
            );
            monikers::DEFAULT_CORELIB_VERSION
        });
        monikers::moniker_for_version(version)
    }
}
