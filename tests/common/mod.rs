// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use fxresolver::metadata::FileVersion;
use fxresolver::{
    HostEnvironment, MetadataError, MetadataReader, ModuleHandle, OsPlatform, ProcessArch,
    ReadOptions, RuntimeFlavor,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Synthetic host with every signal settable
#[derive(Debug, Clone)]
pub struct FakeHost {
    pub os: OsPlatform,
    pub arch: ProcessArch,
    pub flavor: RuntimeFlavor,
    pub implementation_dir: Option<PathBuf>,
    pub toolchain_dir: PathBuf,
    pub entry_binary: Option<PathBuf>,
    pub loaded_value_tuple: Option<PathBuf>,
}

impl FakeHost {
    /// linux-x64 host on the modern runtime
    pub fn core(runtime_dir: &Path, toolchain_dir: &Path) -> Self {
        Self {
            os: OsPlatform::Linux,
            arch: ProcessArch::X64,
            flavor: RuntimeFlavor::Core,
            implementation_dir: Some(runtime_dir.to_path_buf()),
            toolchain_dir: toolchain_dir.to_path_buf(),
            entry_binary: None,
            loaded_value_tuple: None,
        }
    }

    /// win-x64 host on the desktop framework
    pub fn desktop(framework_dir: &Path, toolchain_dir: &Path) -> Self {
        Self {
            os: OsPlatform::Windows,
            flavor: RuntimeFlavor::Desktop,
            ..Self::core(framework_dir, toolchain_dir)
        }
    }
}

impl HostEnvironment for FakeHost {
    fn os_platform(&self) -> OsPlatform {
        self.os
    }

    fn process_arch(&self) -> ProcessArch {
        self.arch
    }

    fn runtime_flavor(&self) -> RuntimeFlavor {
        self.flavor
    }

    fn implementation_dir(&self) -> Option<PathBuf> {
        self.implementation_dir.clone()
    }

    fn toolchain_dir(&self) -> PathBuf {
        self.toolchain_dir.clone()
    }

    fn entry_binary(&self) -> Option<PathBuf> {
        self.entry_binary.clone()
    }

    fn loaded_value_tuple(&self) -> Option<PathBuf> {
        self.loaded_value_tuple.clone()
    }
}

/// In-memory reference graph keyed by file stem
///
/// Files whose stem is not in the graph fail like native binaries.
#[derive(Debug, Default)]
pub struct FakeMetadataReader {
    graph: HashMap<String, Vec<String>>,
    opened: RefCell<Vec<String>>,
}

impl FakeMetadataReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, references: &[&str]) -> Self {
        self.graph.insert(
            name.to_string(),
            references.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// Stems passed to `open`, in call order
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl MetadataReader for FakeMetadataReader {
    fn open(&self, path: &Path, _options: ReadOptions) -> Result<ModuleHandle, MetadataError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.opened.borrow_mut().push(stem.clone());

        match self.graph.get(&stem) {
            Some(references) => Ok(ModuleHandle::new(Some(stem), references.clone())),
            None => Err(MetadataError::NotManaged {
                path: path.display().to_string(),
            }),
        }
    }
}

/// A dotnet install tree in a temp dir:
/// `shared/Microsoft.NETCore.App/<version>`, `packs/...`, `sdk/...`, plus a
/// separate toolchain dir
pub struct DotnetInstall {
    pub temp: TempDir,
    pub root: PathBuf,
    pub runtime_dir: PathBuf,
    pub toolchain_dir: PathBuf,
    pub version: String,
}

impl DotnetInstall {
    pub fn new(version: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("dotnet");
        let runtime_dir = root
            .join("shared")
            .join("Microsoft.NETCore.App")
            .join(version);
        let toolchain_dir = temp.path().join("tools");
        fs::create_dir_all(&runtime_dir).unwrap();
        fs::create_dir_all(&toolchain_dir).unwrap();

        Self {
            temp,
            root,
            runtime_dir,
            toolchain_dir,
            version: version.to_string(),
        }
    }

    pub fn add_runtime_file(&self, file: &str) -> PathBuf {
        write_stub(&self.runtime_dir.join(file))
    }

    pub fn add_tool_file(&self, file: &str) -> PathBuf {
        write_stub(&self.toolchain_dir.join(file))
    }

    /// `packs/Microsoft.NETCore.App.Ref/<version>/ref/<tfm>` holding `files`
    pub fn add_reference_pack(&self, tfm: &str, files: &[&str]) -> PathBuf {
        let dir = self
            .root
            .join("packs")
            .join("Microsoft.NETCore.App.Ref")
            .join(&self.version)
            .join("ref")
            .join(tfm);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            write_stub(&dir.join(file));
        }
        dir
    }

    /// `sdk/<sdk_version>` whose runtime config names this runtime
    pub fn add_sdk(&self, sdk_version: &str, tfm: &str) -> PathBuf {
        let sdk = self.root.join("sdk").join(sdk_version);
        fs::create_dir_all(&sdk).unwrap();
        fs::write(
            sdk.join("dotnet.runtimeconfig.json"),
            format!(
                r#"{{
  "runtimeOptions": {{
    "tfm": "{}",
    "framework": {{
      "name": "Microsoft.NETCore.App",
      "version": "{}"
    }}
  }}
}}"#,
                tfm, self.version
            ),
        )
        .unwrap();
        sdk
    }

    pub fn core_host(&self) -> FakeHost {
        FakeHost::core(&self.runtime_dir, &self.toolchain_dir)
    }
}

pub fn write_stub(path: &Path) -> PathBuf {
    fs::write(path, b"MZ").unwrap();
    path.to_path_buf()
}

fn push_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn pad_to(bytes: &mut Vec<u8>, len: usize) {
    bytes.resize(len, 0);
}

fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

/// Metadata root with an Assembly row for `name` and AssemblyRef rows for `references`
pub fn metadata_root(name: &str, references: &[&str]) -> Vec<u8> {
    let mut strings = vec![0u8];
    let mut intern = |text: &str| -> u16 {
        let offset = strings.len() as u16;
        strings.extend_from_slice(text.as_bytes());
        strings.push(0);
        offset
    };
    let name_index = intern(name);
    let reference_indexes: Vec<u16> = references.iter().map(|r| intern(*r)).collect();
    let strings_len = align(strings.len(), 4);
    pad_to(&mut strings, strings_len);

    let mut tables = Vec::new();
    push_u32(&mut tables, 0);
    tables.extend_from_slice(&[2, 0, 0, 1]);
    let valid: u64 = (1 << 0x20) | (1 << 0x23);
    tables.extend_from_slice(&valid.to_le_bytes());
    tables.extend_from_slice(&0u64.to_le_bytes());
    push_u32(&mut tables, 1);
    push_u32(&mut tables, references.len() as u32);

    // Assembly: HashAlgId, version, Flags, PublicKey, Name, Culture
    push_u32(&mut tables, 0x8004);
    for part in [1u16, 0, 0, 0] {
        push_u16(&mut tables, part);
    }
    push_u32(&mut tables, 0);
    push_u16(&mut tables, 0);
    push_u16(&mut tables, name_index);
    push_u16(&mut tables, 0);

    // AssemblyRef: version, Flags, PublicKeyOrToken, Name, Culture, HashValue
    for index in reference_indexes {
        for part in [4u16, 2, 0, 0] {
            push_u16(&mut tables, part);
        }
        push_u32(&mut tables, 0);
        push_u16(&mut tables, 0);
        push_u16(&mut tables, index);
        push_u16(&mut tables, 0);
        push_u16(&mut tables, 0);
    }
    let tables_len = align(tables.len(), 4);
    pad_to(&mut tables, tables_len);

    let tables_offset = 64u32;
    let strings_offset = tables_offset + tables.len() as u32;

    let mut root = Vec::new();
    push_u32(&mut root, 0x424A_5342);
    push_u16(&mut root, 1);
    push_u16(&mut root, 1);
    push_u32(&mut root, 0);
    push_u32(&mut root, 12);
    root.extend_from_slice(b"v4.0.30319\0\0");
    push_u16(&mut root, 0);
    push_u16(&mut root, 2);
    push_u32(&mut root, tables_offset);
    push_u32(&mut root, tables.len() as u32);
    root.extend_from_slice(b"#~\0\0");
    push_u32(&mut root, strings_offset);
    push_u32(&mut root, strings.len() as u32);
    root.extend_from_slice(b"#Strings\0\0\0\0");
    root.extend_from_slice(&tables);
    root.extend_from_slice(&strings);
    root
}

const PE_OFFSET: usize = 0x80;
const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: usize = 0x2000;
const SECTION_RVA: u32 = 0x2000;
const CLI_HEADER_SIZE: usize = 72;
const RT_VERSION: u32 = 16;

/// Contents of the single `.text` section of a synthetic PE32 DLL
#[derive(Debug, Default, Clone)]
pub struct PeContents<'a> {
    /// Arbitrary bytes at the start of the section
    pub prefix: &'a [u8],
    /// Metadata root behind a CLI header; `None` makes a native image
    pub metadata: Option<&'a [u8]>,
    /// Fixed file version carried in an `RT_VERSION` resource
    pub file_version: Option<FileVersion>,
}

/// `VS_FIXEDFILEINFO` for `version`
pub fn fixed_file_info(version: FileVersion) -> Vec<u8> {
    let ms = ((version.major as u32) << 16) | version.minor as u32;
    let ls = ((version.build as u32) << 16) | version.revision as u32;
    let mut block = Vec::new();
    for word in [0xFEEF_04BD, 0x0001_0000, ms, ls, ms, ls, 0x3F, 0, 0x4, 0x2, 0, 0, 0] {
        push_u32(&mut block, word);
    }
    block
}

/// Resource directory tree `RT_VERSION/1/0x409` whose data starts at `rva + 96`
fn version_resource(rva: u32, version: FileVersion) -> Vec<u8> {
    let mut value = Vec::new();
    let key: Vec<u16> = "VS_VERSION_INFO\0".encode_utf16().collect();
    let fixed = fixed_file_info(version);
    push_u16(&mut value, 0);
    push_u16(&mut value, fixed.len() as u16);
    push_u16(&mut value, 0);
    for unit in key {
        push_u16(&mut value, unit);
    }
    let value_start = align(value.len(), 4);
    pad_to(&mut value, value_start);
    value.extend_from_slice(&fixed);
    let value_len = value.len() as u16;
    value[..2].copy_from_slice(&value_len.to_le_bytes());

    let directory = |bytes: &mut Vec<u8>| {
        for _ in 0..3 {
            push_u32(bytes, 0);
        }
        push_u16(bytes, 0);
        push_u16(bytes, 1);
    };

    let mut tree = Vec::new();
    directory(&mut tree);
    push_u32(&mut tree, RT_VERSION);
    push_u32(&mut tree, 0x8000_0000 | 24);
    directory(&mut tree);
    push_u32(&mut tree, 1);
    push_u32(&mut tree, 0x8000_0000 | 48);
    directory(&mut tree);
    push_u32(&mut tree, 0x409);
    push_u32(&mut tree, 80);
    // data entry: rva, size, code page, reserved
    push_u32(&mut tree, rva + 96);
    push_u32(&mut tree, value.len() as u32);
    push_u32(&mut tree, 0);
    push_u32(&mut tree, 0);
    assert_eq!(tree.len(), 96);
    tree.extend_from_slice(&value);
    tree
}

/// Minimal PE32 DLL with one section holding a CLI header and `metadata`;
/// `None` produces a native image without a CLI header
pub fn pe_image(metadata: Option<&[u8]>) -> Vec<u8> {
    build_pe_image(&PeContents {
        metadata,
        ..PeContents::default()
    })
}

/// Native PE32 DLL carrying only a version resource
pub fn versioned_pe_image(version: FileVersion) -> Vec<u8> {
    build_pe_image(&PeContents {
        file_version: Some(version),
        ..PeContents::default()
    })
}

pub fn build_pe_image(contents: &PeContents<'_>) -> Vec<u8> {
    let mut section = contents.prefix.to_vec();
    let cli_offset = align(section.len(), 8);
    pad_to(&mut section, cli_offset);
    if let Some(metadata) = contents.metadata {
        let metadata_rva = SECTION_RVA + (cli_offset + CLI_HEADER_SIZE) as u32;
        push_u32(&mut section, CLI_HEADER_SIZE as u32);
        push_u16(&mut section, 2);
        push_u16(&mut section, 5);
        push_u32(&mut section, metadata_rva);
        push_u32(&mut section, metadata.len() as u32);
        push_u32(&mut section, 1);
        pad_to(&mut section, cli_offset + CLI_HEADER_SIZE);
        section.extend_from_slice(metadata);
    } else {
        section.extend_from_slice(&[0xC3; 16]);
    }

    let mut resource_directory = None;
    if let Some(version) = contents.file_version {
        let resource_offset = align(section.len(), 16);
        pad_to(&mut section, resource_offset);
        let rva = SECTION_RVA + resource_offset as u32;
        let resource = version_resource(rva, version);
        resource_directory = Some((rva, resource.len() as u32));
        section.extend_from_slice(&resource);
    }

    let virtual_size = section.len();
    let raw_size = align(virtual_size, FILE_ALIGNMENT);
    pad_to(&mut section, raw_size);

    let mut image = Vec::new();
    image.extend_from_slice(b"MZ");
    pad_to(&mut image, 0x3C);
    push_u32(&mut image, PE_OFFSET as u32);
    pad_to(&mut image, PE_OFFSET);
    image.extend_from_slice(b"PE\0\0");

    // COFF file header
    push_u16(&mut image, 0x014C);
    push_u16(&mut image, 1);
    push_u32(&mut image, 0);
    push_u32(&mut image, 0);
    push_u32(&mut image, 0);
    push_u16(&mut image, 224);
    push_u16(&mut image, 0x2102);

    // Optional header, standard fields
    push_u16(&mut image, 0x10B);
    image.extend_from_slice(&[8, 0]);
    push_u32(&mut image, raw_size as u32);
    push_u32(&mut image, 0);
    push_u32(&mut image, 0);
    push_u32(&mut image, 0);
    push_u32(&mut image, SECTION_RVA);
    push_u32(&mut image, 0);

    // Windows fields
    push_u32(&mut image, 0x1000_0000);
    push_u32(&mut image, SECTION_ALIGNMENT as u32);
    push_u32(&mut image, FILE_ALIGNMENT as u32);
    for version in [4u16, 0, 0, 0, 4, 0] {
        push_u16(&mut image, version);
    }
    push_u32(&mut image, 0);
    push_u32(
        &mut image,
        (SECTION_RVA as usize + align(virtual_size, SECTION_ALIGNMENT)) as u32,
    );
    push_u32(&mut image, FILE_ALIGNMENT as u32);
    push_u32(&mut image, 0);
    push_u16(&mut image, 3);
    push_u16(&mut image, 0x8540);
    push_u32(&mut image, 0x10_0000);
    push_u32(&mut image, 0x1000);
    push_u32(&mut image, 0x10_0000);
    push_u32(&mut image, 0x1000);
    push_u32(&mut image, 0);
    push_u32(&mut image, 16);

    // Data directories: resources (2) and the CLI header (14)
    for directory in 0..16 {
        let entry = match directory {
            2 => resource_directory,
            14 => contents
                .metadata
                .map(|_| (SECTION_RVA + cli_offset as u32, CLI_HEADER_SIZE as u32)),
            _ => None,
        };
        let (rva, size) = entry.unwrap_or((0, 0));
        push_u32(&mut image, rva);
        push_u32(&mut image, size);
    }

    // Section table
    image.extend_from_slice(b".text\0\0\0");
    push_u32(&mut image, virtual_size as u32);
    push_u32(&mut image, SECTION_RVA);
    push_u32(&mut image, raw_size as u32);
    push_u32(&mut image, FILE_ALIGNMENT as u32);
    push_u32(&mut image, 0);
    push_u32(&mut image, 0);
    push_u16(&mut image, 0);
    push_u16(&mut image, 0);
    push_u32(&mut image, 0x6000_0020);

    pad_to(&mut image, FILE_ALIGNMENT);
    image.extend_from_slice(&section);
    image
}

/// Write a managed assembly named after the file stem referencing `references`
pub fn write_managed_assembly(dir: &Path, name: &str, references: &[&str]) -> PathBuf {
    let path = dir.join(format!("{}.dll", name));
    fs::write(&path, pe_image(Some(&metadata_root(name, references)))).unwrap();
    path
}

pub fn write_native_library(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, pe_image(None)).unwrap();
    path
}
