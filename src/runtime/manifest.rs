// src/runtime/manifest.rs

//! Targeted extraction from runtime JSON manifests
//!
//! The SDK runtime config and the dependency manifest are external formats.
//! Only single string values are needed from them, so they are located by
//! literal substring search instead of a full parse.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime config file shipped inside every SDK directory
pub const SDK_MANIFEST_FILE: &str = "dotnet.runtimeconfig.json";

/// Extension that replaces the entry binary's own to find its dependency manifest
pub const DEPS_MANIFEST_EXTENSION: &str = "deps.json";

/// Extract the string value of the first `"key": "value"` pair in `text`
pub fn extract_field(text: &str, key: &str) -> Option<String> {
    let marker = format!("\"{}\"", key);
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(&marker) {
        let after_key = search_from + found + marker.len();
        search_from = after_key;

        let rest = text[after_key..].trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            // The marker appeared as a value, keep looking
            continue;
        };
        let rest = rest.trim_start().strip_prefix('"')?;
        let end = rest.find('"')?;
        let value = &rest[..end];
        return (!value.is_empty()).then(|| value.to_string());
    }

    None
}

/// Text between the first occurrence of `prefix` and the next double quote
pub fn extract_after_prefix(text: &str, prefix: &str) -> Option<String> {
    let start = text.find(prefix)? + prefix.len();
    let rest = &text[start..];
    let end = rest.find('"')?;
    let value = &rest[..end];
    (!value.is_empty()).then(|| value.to_string())
}

/// Path of the SDK runtime config under `sdk_root`
pub fn sdk_manifest_path(sdk_root: &Path) -> PathBuf {
    sdk_root.join(SDK_MANIFEST_FILE)
}

/// Read a single field from the SDK runtime config
///
/// Returns `None` when the file is missing, unreadable or lacks the field.
pub fn read_sdk_field(sdk_root: &Path, key: &str) -> Option<String> {
    let path = sdk_manifest_path(sdk_root);
    match fs::read_to_string(&path) {
        Ok(text) => extract_field(&text, key),
        Err(e) => {
            debug!("Cannot read SDK manifest {}: {}", path.display(), e);
            None
        }
    }
}

/// Dependency manifest sitting next to an entry binary
pub fn deps_manifest_path(entry_binary: &Path) -> PathBuf {
    entry_binary.with_extension(DEPS_MANIFEST_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNTIME_CONFIG: &str = r#"{
  "runtimeOptions": {
    "tfm": "netcoreapp3.1",
    "framework": {
      "name": "Microsoft.NETCore.App",
      "version": "3.1.32"
    }
  }
}"#;

    #[test]
    fn test_extract_field_version() {
        assert_eq!(
            extract_field(RUNTIME_CONFIG, "version"),
            Some("3.1.32".to_string())
        );
    }

    #[test]
    fn test_extract_field_tfm() {
        assert_eq!(
            extract_field(RUNTIME_CONFIG, "tfm"),
            Some("netcoreapp3.1".to_string())
        );
    }

    #[test]
    fn test_extract_field_missing() {
        assert_eq!(extract_field(RUNTIME_CONFIG, "rollForward"), None);
    }

    #[test]
    fn test_extract_field_skips_value_occurrences() {
        let text = r#"{"name": "version", "version": "6.0.0"}"#;
        assert_eq!(extract_field(text, "version"), Some("6.0.0".to_string()));
    }

    #[test]
    fn test_extract_field_compact_json() {
        let text = r#"{"runtimeOptions":{"tfm":"net8.0"}}"#;
        assert_eq!(extract_field(text, "tfm"), Some("net8.0".to_string()));
    }

    #[test]
    fn test_extract_after_prefix() {
        let text = r#"{"runtimeTarget": {"name": ".NETCoreApp,Version=v5.0", "signature": ""}}"#;
        assert_eq!(
            extract_after_prefix(text, ".NETCoreApp,Version=v"),
            Some("5.0".to_string())
        );
        assert_eq!(extract_after_prefix(text, "nothing-here"), None);
    }

    #[test]
    fn test_deps_manifest_path() {
        assert_eq!(
            deps_manifest_path(Path::new("/opt/tool/fsi.dll")),
            PathBuf::from("/opt/tool/fsi.deps.json")
        );
        assert_eq!(
            deps_manifest_path(Path::new("/opt/tool/fxresolver")),
            PathBuf::from("/opt/tool/fxresolver.deps.json")
        );
    }
}
