// src/platform.rs

//! Platform identifier (RID) inference

use crate::host::{HostEnvironment, OsPlatform, ProcessArch};

/// Computes the `<os>-<arch>` platform identifier
pub struct PlatformIdentifierResolver;

impl PlatformIdentifierResolver {
    /// Return `explicit` unchanged when given, otherwise derive the RID from the host
    pub fn resolve<H: HostEnvironment + ?Sized>(host: &H, explicit: Option<&str>) -> String {
        match explicit {
            Some(rid) => rid.to_string(),
            None => Self::compose(host.os_platform(), host.process_arch()),
        }
    }

    /// Combine OS and architecture tags
    pub fn compose(os: OsPlatform, arch: ProcessArch) -> String {
        format!("{}{}", Self::os_tag(os), Self::arch_suffix(arch))
    }

    /// Linux is assumed for anything that is neither Windows nor macOS
    fn os_tag(os: OsPlatform) -> &'static str {
        match os {
            OsPlatform::Windows => "win",
            OsPlatform::MacOs => "osx",
            OsPlatform::Linux | OsPlatform::Other => "linux",
        }
    }

    /// Unrecognized architectures map to 32-bit ARM
    fn arch_suffix(arch: ProcessArch) -> &'static str {
        match arch {
            ProcessArch::X64 => "-x64",
            ProcessArch::X86 => "-x86",
            ProcessArch::Arm64 => "-arm64",
            ProcessArch::Arm | ProcessArch::Other => "-arm",
        }
    }
}
