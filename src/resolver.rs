// src/resolver.rs

//! Top-level reference resolution
//!
//! [`FxResolver`] establishes the runtime identity once at construction and
//! then answers reference queries against it:
//!
//! - a desktop target gets the fixed legacy list
//! - a modern target gets the reference pack listing when one is installed
//! - otherwise the closure of the runtime's own binaries is computed

use crate::closure::{AssemblyReference, DependencyClosureBuilder};
use crate::config::ResolverConfig;
use crate::defaults::{DefaultReferenceSets, get_system_assembly_names};
use crate::error::{Error, Result};
use crate::host::{HostEnvironment, OsPlatform, SystemHost};
use crate::metadata::{ClrMetadataReader, MetadataReader};
use crate::refpack::ReferencePackLocator;
use crate::runtime::RuntimeEnvironment;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ASSEMBLY_EXTENSION: &str = "dll";

pub struct FxResolver<H = SystemHost, R = ClrMetadataReader> {
    host: H,
    reader: R,
    config: ResolverConfig,
    environment: RuntimeEnvironment,
}

impl FxResolver {
    /// Resolver for the current machine
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let host = SystemHost::detect(config.toolchain_dir.clone());
        Self::with_host(host, ClrMetadataReader::new(), config)
    }
}

impl<H: HostEnvironment, R: MetadataReader> FxResolver<H, R> {
    /// Resolver over an explicit host and metadata reader
    ///
    /// Fails when the runtime directory cannot be established.
    pub fn with_host(host: H, reader: R, config: ResolverConfig) -> Result<Self> {
        let environment = RuntimeEnvironment::detect(&host, &config)?;
        Ok(Self {
            host,
            reader,
            config,
            environment,
        })
    }

    pub fn environment(&self) -> &RuntimeEnvironment {
        &self.environment
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn get_target_framework_moniker(&self) -> &str {
        self.environment.tfm()
    }

    pub fn get_platform_identifier(&self) -> &str {
        self.environment.rid()
    }

    /// Moniker and platform identifier together
    pub fn get_tfm_and_rid(&self) -> (&str, &str) {
        (self.environment.tfm(), self.environment.rid())
    }

    pub fn get_reference_pack_directory(&self) -> Option<PathBuf> {
        ReferencePackLocator::locate(&self.environment)
    }

    pub fn is_under_reference_pack_directory(&self, path: &Path) -> bool {
        ReferencePackLocator::is_under_reference_pack_directory(self.environment.runtime_dir(), path)
    }

    /// Names classified as platform assemblies
    pub fn get_system_assembly_names(&self) -> HashSet<String> {
        let mut names = get_system_assembly_names();
        names.insert(self.config.runtime_support_library.clone());
        names
    }

    /// References for scripts and project-less sources
    pub fn get_default_references(
        &self,
        use_interactive_support_library: bool,
        use_desktop_target: bool,
        use_reference_pack: bool,
    ) -> Result<Vec<AssemblyReference>> {
        if use_desktop_target {
            let interactive = use_interactive_support_library
                .then_some(self.config.interactive_support_library.as_str());
            return Ok(DefaultReferenceSets::desktop_references(
                &self.host,
                self.environment.runtime_dir(),
                &self.config.runtime_support_library,
                interactive,
            ));
        }

        if use_reference_pack {
            if let Some(references) = self.reference_pack_references(use_interactive_support_library) {
                return Ok(references);
            }
        }

        self.closure_references(use_interactive_support_library)
    }

    /// Same set as [`Self::get_default_references`], used when seeding a
    /// script's load closure
    pub fn get_basic_script_closure_references(
        &self,
        use_interactive_support_library: bool,
        use_reference_pack: bool,
        use_desktop_target: bool,
    ) -> Result<Vec<AssemblyReference>> {
        self.get_default_references(
            use_interactive_support_library,
            use_desktop_target,
            use_reference_pack,
        )
    }

    /// `<toolchain dir>/<name>.dll` for the support libraries in use
    fn support_libraries(&self, use_interactive_support_library: bool) -> Vec<PathBuf> {
        let toolchain_dir = self.host.toolchain_dir();
        let mut libraries = vec![toolchain_dir.join(format!(
            "{}.{}",
            self.config.runtime_support_library, ASSEMBLY_EXTENSION
        ))];
        if use_interactive_support_library {
            libraries.push(toolchain_dir.join(format!(
                "{}.{}",
                self.config.interactive_support_library, ASSEMBLY_EXTENSION
            )));
        }
        libraries
    }

    fn reference_pack_references(&self, use_interactive_support_library: bool) -> Option<Vec<AssemblyReference>> {
        let pack = self.get_reference_pack_directory()?;
        let assemblies = match list_assemblies(&pack) {
            Ok(assemblies) => assemblies,
            Err(e) => {
                debug!("Cannot list reference pack {}: {}", pack.display(), e);
                return None;
            }
        };

        info!(
            "Using {} reference assemblies from {}",
            assemblies.len(),
            pack.display()
        );
        Some(
            assemblies
                .into_iter()
                .chain(self.support_libraries(use_interactive_support_library))
                .map(AssemblyReference::Path)
                .collect(),
        )
    }

    fn closure_references(&self, use_interactive_support_library: bool) -> Result<Vec<AssemblyReference>> {
        let runtime_dir = self.environment.runtime_dir();
        let seeds: Vec<AssemblyReference> = list_assemblies(runtime_dir)?
            .into_iter()
            .chain(self.support_libraries(use_interactive_support_library))
            .map(AssemblyReference::Path)
            .collect();

        let case_insensitive = matches!(
            self.host.os_platform(),
            OsPlatform::Windows | OsPlatform::MacOs
        );
        let closure = DependencyClosureBuilder::new(runtime_dir, &self.reader)
            .with_case_insensitive(case_insensitive)
            .build_closure(&seeds);

        info!(
            "Resolved {} implementation assemblies from {}",
            closure.len(),
            runtime_dir.display()
        );
        Ok(closure
            .into_paths()
            .into_iter()
            .map(AssemblyReference::Path)
            .collect())
    }
}

/// `*.dll` files directly in `dir`, sorted
fn list_assemblies(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::IoError(format!("Cannot list {}: {}", dir.display(), e)))?;

    let mut assemblies: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(ASSEMBLY_EXTENSION))
        })
        .collect();
    assemblies.sort();
    Ok(assemblies)
}
