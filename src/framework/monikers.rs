// src/framework/monikers.rs

//! Legacy desktop file-version to moniker table

use crate::metadata::FileVersion;

/// One row of the version table: minimum per-field thresholds and the moniker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonikerRow {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
    pub moniker: &'static str,
}

impl MonikerRow {
    const fn new(major: u16, minor: u16, build: u16, revision: u16, moniker: &'static str) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
            moniker,
        }
    }

    /// Every field of `version` is at least the row's threshold
    ///
    /// NOTE: fields are compared independently, not as an ordered version.
    /// (4, 6, 1055, 0) therefore matches the 4.6.57 row before the 4.6.1055
    /// one. Kept as is; callers rely on the observed monikers.
    pub fn matches(&self, version: FileVersion) -> bool {
        version.major >= self.major
            && version.minor >= self.minor
            && version.build >= self.build
            && version.revision >= self.revision
    }
}

/// Checked top to bottom, first match wins
pub const DESKTOP_MONIKERS: &[MonikerRow] = &[
    MonikerRow::new(4, 8, 3815, 0, "net48"),
    MonikerRow::new(4, 8, 3761, 0, "net48"),
    MonikerRow::new(4, 7, 3190, 0, "net472"),
    MonikerRow::new(4, 7, 3062, 0, "net472"),
    MonikerRow::new(4, 7, 2600, 0, "net471"),
    MonikerRow::new(4, 7, 2558, 0, "net471"),
    MonikerRow::new(4, 7, 2053, 0, "net47"),
    MonikerRow::new(4, 7, 2046, 0, "net47"),
    MonikerRow::new(4, 6, 1590, 0, "net462"),
    MonikerRow::new(4, 6, 57, 0, "net462"),
    MonikerRow::new(4, 6, 1055, 0, "net461"),
    MonikerRow::new(4, 6, 81, 0, "net46"),
    MonikerRow::new(4, 0, 30319, 34209, "net452"),
    MonikerRow::new(4, 0, 30319, 17020, "net452"),
    MonikerRow::new(4, 0, 30319, 18408, "net451"),
    MonikerRow::new(4, 0, 30319, 17929, "net45"),
    MonikerRow::new(4, 0, 30319, 1, "net4"),
];

/// Returned when no row matches
pub const DEFAULT_DESKTOP_MONIKER: &str = "net48";

/// Assumed core library version when its file version cannot be read
pub const DEFAULT_CORELIB_VERSION: FileVersion = FileVersion::new(4, 8, 3815, 0);

/// Modern runtime without any manifest: oldest supported long-term release
pub const FALLBACK_CORE_MONIKER: &str = "netcoreapp3.1";

/// Moniker for a desktop core library file version
pub fn moniker_for_version(version: FileVersion) -> &'static str {
    DESKTOP_MONIKERS
        .iter()
        .find(|row| row.matches(version))
        .map(|row| row.moniker)
        .unwrap_or(DEFAULT_DESKTOP_MONIKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u16, minor: u16, build: u16, revision: u16) -> FileVersion {
        FileVersion::new(major, minor, build, revision)
    }

    #[test]
    fn test_net48_and_above() {
        assert_eq!(moniker_for_version(v(4, 8, 3815, 0)), "net48");
        assert_eq!(moniker_for_version(v(4, 8, 4420, 0)), "net48");
        assert_eq!(moniker_for_version(v(4, 8, 3761, 0)), "net48");
        assert_eq!(moniker_for_version(DEFAULT_CORELIB_VERSION), "net48");
    }

    #[test]
    fn test_net47x_rows() {
        assert_eq!(moniker_for_version(v(4, 7, 3190, 0)), "net472");
        assert_eq!(moniker_for_version(v(4, 7, 3062, 0)), "net472");
        assert_eq!(moniker_for_version(v(4, 7, 2600, 0)), "net471");
        assert_eq!(moniker_for_version(v(4, 7, 2053, 0)), "net47");
    }

    #[test]
    fn test_per_field_comparison_is_preserved() {
        // 4.6.1055 hits the 4.6.57 row first
        assert_eq!(moniker_for_version(v(4, 6, 1055, 0)), "net462");
        // a higher build with a lower minor still satisfies the 4.0 rows
        assert_eq!(moniker_for_version(v(4, 5, 40000, 40000)), "net452");
    }

    #[test]
    fn test_net4x_revisions() {
        assert_eq!(moniker_for_version(v(4, 0, 30319, 34209)), "net452");
        // 17929 and 18408 are shadowed by the 17020 row
        assert_eq!(moniker_for_version(v(4, 0, 30319, 17929)), "net452");
        assert_eq!(moniker_for_version(v(4, 0, 30319, 18408)), "net452");
        assert_eq!(moniker_for_version(v(4, 0, 30319, 17000)), "net4");
        assert_eq!(moniker_for_version(v(4, 0, 30319, 1)), "net4");
    }

    #[test]
    fn test_below_every_row_uses_default() {
        assert_eq!(moniker_for_version(v(2, 0, 50727, 0)), DEFAULT_DESKTOP_MONIKER);
        assert_eq!(moniker_for_version(v(4, 0, 30319, 0)), DEFAULT_DESKTOP_MONIKER);
    }
}
