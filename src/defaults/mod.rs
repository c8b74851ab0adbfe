// src/defaults/mod.rs

//! Fixed reference lists
//!
//! Plain data kept apart from the resolution logic: the legacy desktop
//! reference list for scripts and the set of names classified as system
//! assemblies.

pub mod system;

pub use system::{SYSTEM_ASSEMBLIES, get_system_assembly_names};

use crate::closure::AssemblyReference;
use crate::host::HostEnvironment;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Desktop references placed before the language support libraries
pub const DESKTOP_FRAMEWORK_REFERENCES: &[&str] = &[
    "mscorlib",
    "System",
    "System.Xml",
    "System.Runtime.Remoting",
    "System.Runtime.Serialization.Formatters.Soap",
    "System.Data",
    "System.Drawing",
    "System.Core",
    "System.Configuration",
];

/// Facades needed when a script pulls in portable or netstandard components
pub const DESKTOP_FACADE_REFERENCES: &[&str] = &[
    "netstandard",
    "System.Runtime",
    "System.Linq",
    "System.Reflection",
    "System.Linq.Expressions",
    "System.Threading.Tasks",
    "System.IO",
    "System.Net.Requests",
    "System.Collections",
    "System.Runtime.Numerics",
    "System.Threading",
    "System.Web",
    "System.Web.Services",
    "System.Windows.Forms",
    "System.Numerics",
];

pub const VALUE_TUPLE_FILE: &str = "System.ValueTuple.dll";

/// Legacy desktop reference list for scripts
pub struct DefaultReferenceSets;

impl DefaultReferenceSets {
    /// Framework names, the runtime support library, the interactive library
    /// when requested, a local value tuple assembly if one is found, then
    /// the facades
    pub fn desktop_references<H: HostEnvironment + ?Sized>(
        host: &H,
        runtime_dir: &Path,
        runtime_support_library: &str,
        interactive_support_library: Option<&str>,
    ) -> Vec<AssemblyReference> {
        let mut references: Vec<AssemblyReference> = DESKTOP_FRAMEWORK_REFERENCES
            .iter()
            .map(|name| AssemblyReference::from(*name))
            .collect();

        references.push(runtime_support_library.into());
        if let Some(interactive) = interactive_support_library {
            references.push(interactive.into());
        }
        if let Some(value_tuple) = Self::value_tuple_reference(host, runtime_dir) {
            references.push(AssemblyReference::Path(value_tuple));
        }

        references.extend(
            DESKTOP_FACADE_REFERENCES
                .iter()
                .map(|name| AssemblyReference::from(*name)),
        );
        references
    }

    /// First value tuple implementation found in the runtime dir, the
    /// host process, or next to the toolchain
    pub fn value_tuple_reference<H: HostEnvironment + ?Sized>(
        host: &H,
        runtime_dir: &Path,
    ) -> Option<PathBuf> {
        let in_runtime = runtime_dir.join(VALUE_TUPLE_FILE);
        if in_runtime.is_file() {
            return Some(in_runtime);
        }

        if let Some(loaded) = host.loaded_value_tuple() {
            return Some(loaded);
        }

        let sibling = host.toolchain_dir().join(VALUE_TUPLE_FILE);
        if sibling.is_file() {
            return Some(sibling);
        }

        debug!("No {} available", VALUE_TUPLE_FILE);
        None
    }
}
