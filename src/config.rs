// src/config.rs

//! Resolver configuration
//!
//! Loaded from `<config dir>/fxresolver/config.toml` when present, then
//! overridden from the environment.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_RUNTIME_SUPPORT_LIBRARY: &str = "FSharp.Core";
pub const DEFAULT_INTERACTIVE_SUPPORT_LIBRARY: &str = "FSharp.Compiler.Interactive.Settings";

pub const SDK_ROOT_ENV: &str = "FXRESOLVER_SDK_ROOT";
pub const RID_ENV: &str = "FXRESOLVER_RID";
pub const TOOLCHAIN_DIR_ENV: &str = "FXRESOLVER_TOOLCHAIN_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// SDK directory to derive the runtime from (e.g. `/usr/share/dotnet/sdk/8.0.100`)
    pub sdk_root: Option<PathBuf>,

    /// Platform identifier used verbatim instead of the detected one
    pub rid: Option<String>,

    /// Where the toolchain's own libraries live
    pub toolchain_dir: Option<PathBuf>,

    /// Simple name of the language runtime support library
    pub runtime_support_library: String,

    /// Simple name of the interactive support library
    pub interactive_support_library: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sdk_root: None,
            rid: None,
            toolchain_dir: None,
            runtime_support_library: DEFAULT_RUNTIME_SUPPORT_LIBRARY.to_string(),
            interactive_support_library: DEFAULT_INTERACTIVE_SUPPORT_LIBRARY.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Parse a TOML config file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(config.with_env_overrides())
    }

    /// User config file if it exists, defaults otherwise
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default().with_env_overrides()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fxresolver").join("config.toml"))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(sdk_root) = lookup(SDK_ROOT_ENV) {
            self.sdk_root = Some(PathBuf::from(sdk_root));
        }
        if let Some(rid) = lookup(RID_ENV) {
            self.rid = Some(rid);
        }
        if let Some(dir) = lookup(TOOLCHAIN_DIR_ENV) {
            self.toolchain_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn with_sdk_root(mut self, sdk_root: impl Into<PathBuf>) -> Self {
        self.sdk_root = Some(sdk_root.into());
        self
    }

    pub fn with_rid(mut self, rid: impl Into<String>) -> Self {
        self.rid = Some(rid.into());
        self
    }

    pub fn with_toolchain_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.toolchain_dir = Some(dir.into());
        self
    }

    pub fn with_runtime_support_library(mut self, name: impl Into<String>) -> Self {
        self.runtime_support_library = name.into();
        self
    }

    pub fn with_interactive_support_library(mut self, name: impl Into<String>) -> Self {
        self.interactive_support_library = name.into();
        self
    }
}
