// src/lib.rs

//! fxresolver
//!
//! Works out which reference assemblies a script compiler should use on the
//! current machine.
//!
//! # Architecture
//!
//! - Identity: runtime directory, version, target framework moniker and
//!   platform identifier, computed once per resolver
//! - Reference packs: reference-only assemblies shipped with the SDK, used
//!   directly when present
//! - Closure: otherwise the runtime's implementation binaries are walked
//!   through their assembly references
//! - Desktop targets: a fixed legacy reference list

pub mod closure;
pub mod config;
pub mod defaults;
mod error;
pub mod framework;
pub mod host;
pub mod metadata;
pub mod platform;
pub mod refpack;
pub mod resolver;
pub mod runtime;
pub mod sdk;

pub use closure::{AssemblyReference, DependencyClosure, DependencyClosureBuilder};
pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use framework::TargetFrameworkResolver;
pub use host::{HostEnvironment, OsPlatform, ProcessArch, RuntimeFlavor, SystemHost};
pub use metadata::{ClrMetadataReader, MetadataError, MetadataReader, ModuleHandle, ReadOptions};
pub use platform::PlatformIdentifierResolver;
pub use refpack::ReferencePackLocator;
pub use resolver::FxResolver;
pub use runtime::{RuntimeEnvironment, RuntimeLocator};
pub use sdk::try_get_default_sdk_root_and_platform;
