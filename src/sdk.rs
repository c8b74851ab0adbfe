// src/sdk.rs

//! SDK discovery for toolchains hosted on the desktop framework
//!
//! A desktop-hosted toolchain targeting the modern runtime has no runtime
//! directory of its own; it asks the installed `dotnet` host which SDK is
//! current and resolves against that.

use crate::error::{Error, Result};
use crate::host::{HostEnvironment, RuntimeFlavor};
use crate::platform::PlatformIdentifierResolver;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Set by the dotnet host for child processes it launches
pub const DOTNET_HOST_PATH_ENV: &str = "DOTNET_HOST_PATH";

/// Default SDK root and platform identifier for a desktop-hosted toolchain
///
/// `None` when the desktop target is requested, when the host already runs
/// on the modern runtime, or when no usable SDK is installed.
pub fn try_get_default_sdk_root_and_platform<H: HostEnvironment + ?Sized>(
    host: &H,
    use_desktop_target: bool,
) -> Option<(PathBuf, String)> {
    if use_desktop_target || host.runtime_flavor() == RuntimeFlavor::Core {
        return None;
    }

    let result = find_dotnet_host().and_then(|dotnet| {
        let version = sdk_version(&dotnet)?;
        Ok(sdk_dir(&dotnet, &version))
    });

    match result {
        Ok(sdk_root) if sdk_root.is_dir() => {
            let rid = PlatformIdentifierResolver::resolve(host, None);
            debug!("Default SDK at {} for {}", sdk_root.display(), rid);
            Some((sdk_root, rid))
        }
        Ok(sdk_root) => {
            debug!("SDK directory {} does not exist", sdk_root.display());
            None
        }
        Err(e) => {
            debug!("No default SDK: {}", e);
            None
        }
    }
}

/// The `dotnet` executable, from `DOTNET_HOST_PATH` or `PATH`
pub fn find_dotnet_host() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(DOTNET_HOST_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }
    which::which("dotnet").map_err(|e| Error::ToolNotFound(format!("dotnet: {}", e)))
}

/// Output of `dotnet --version`
pub fn sdk_version(dotnet: &Path) -> Result<String> {
    let output = Command::new(dotnet)
        .arg("--version")
        .output()
        .map_err(|e| Error::CommandFailed(format!("{} --version: {}", dotnet.display(), e)))?;

    if !output.status.success() {
        return Err(Error::CommandFailed(format!(
            "{} --version: {}",
            dotnet.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_version_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        Error::ParseError(format!("No SDK version printed by {}", dotnet.display()))
    })
}

/// First non-empty line
fn parse_version_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// `<dotnet dir>/sdk/<version>`
pub fn sdk_dir(dotnet: &Path, version: &str) -> PathBuf {
    dotnet
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("sdk")
        .join(version)
}
