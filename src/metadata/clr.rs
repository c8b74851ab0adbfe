// src/metadata/clr.rs

//! ECMA-335 metadata reader for PE files
//!
//! goblin parses the PE container, the CLI header and the metadata root's
//! stream headers. The table stream is decoded here only as far as the
//! Assembly and AssemblyRef tables, which is all a reference walk needs.

use super::{MetadataError, MetadataReader, ModuleHandle, ReadOptions};
use goblin::Object;
use goblin::error::Error as GoblinError;
use goblin::pe::PE;
use goblin::pe::clr::{StorageHeader, StorageSignature, StorageStream};
use goblin::pe::options::ParseOptions;
use goblin::pe::utils::find_offset;
use scroll::{LE, Pread};
use std::fs;
use std::path::Path;

/// Used when an image carries no optional header
const DEFAULT_FILE_ALIGNMENT: u32 = 0x200;

// Heap size flags in the table stream header
const WIDE_STRINGS: u8 = 0x01;
const WIDE_GUIDS: u8 = 0x02;
const WIDE_BLOBS: u8 = 0x04;
const EXTRA_DATA: u8 = 0x40;

// Table numbers
const MODULE: usize = 0x00;
const TYPE_REF: usize = 0x01;
const TYPE_DEF: usize = 0x02;
const FIELD: usize = 0x04;
const METHOD_DEF: usize = 0x06;
const PARAM: usize = 0x08;
const INTERFACE_IMPL: usize = 0x09;
const MEMBER_REF: usize = 0x0A;
const DECL_SECURITY: usize = 0x0E;
const STAND_ALONE_SIG: usize = 0x11;
const EVENT: usize = 0x14;
const PROPERTY: usize = 0x17;
const MODULE_REF: usize = 0x1A;
const TYPE_SPEC: usize = 0x1B;
const ASSEMBLY: usize = 0x20;
const ASSEMBLY_REF: usize = 0x23;
const FILE: usize = 0x26;
const EXPORTED_TYPE: usize = 0x27;
const MANIFEST_RESOURCE: usize = 0x28;
const GENERIC_PARAM: usize = 0x2A;
const METHOD_SPEC: usize = 0x2B;
const GENERIC_PARAM_CONSTRAINT: usize = 0x2C;

/// Column holding the simple name
const ASSEMBLY_NAME_COLUMN: usize = 7;
const ASSEMBLY_REF_NAME_COLUMN: usize = 6;

type Parse<T> = std::result::Result<T, GoblinError>;

fn malformed(reason: String) -> GoblinError {
    GoblinError::Malformed(reason)
}

/// 2 or 4 byte heap/table index
fn read_index(bytes: &[u8], offset: &mut usize, width: usize) -> Parse<u32> {
    if width == 2 {
        Ok(u32::from(bytes.gread_with::<u16>(offset, LE)?))
    } else {
        Ok(bytes.gread_with::<u32>(offset, LE)?)
    }
}

/// Coded index: tag bit count and the tables it can point into
struct CodedIndex {
    bits: u32,
    tables: &'static [usize],
}

const TYPE_DEF_OR_REF: CodedIndex = CodedIndex {
    bits: 2,
    tables: &[TYPE_DEF, TYPE_REF, TYPE_SPEC],
};
const HAS_CONSTANT: CodedIndex = CodedIndex {
    bits: 2,
    tables: &[FIELD, PARAM, PROPERTY],
};
const HAS_CUSTOM_ATTRIBUTE: CodedIndex = CodedIndex {
    bits: 5,
    tables: &[
        METHOD_DEF,
        FIELD,
        TYPE_REF,
        TYPE_DEF,
        PARAM,
        INTERFACE_IMPL,
        MEMBER_REF,
        MODULE,
        DECL_SECURITY,
        PROPERTY,
        EVENT,
        STAND_ALONE_SIG,
        MODULE_REF,
        TYPE_SPEC,
        ASSEMBLY,
        ASSEMBLY_REF,
        FILE,
        EXPORTED_TYPE,
        MANIFEST_RESOURCE,
        GENERIC_PARAM,
        GENERIC_PARAM_CONSTRAINT,
        METHOD_SPEC,
    ],
};
const HAS_FIELD_MARSHAL: CodedIndex = CodedIndex {
    bits: 1,
    tables: &[FIELD, PARAM],
};
const HAS_DECL_SECURITY: CodedIndex = CodedIndex {
    bits: 2,
    tables: &[TYPE_DEF, METHOD_DEF, ASSEMBLY],
};
const MEMBER_REF_PARENT: CodedIndex = CodedIndex {
    bits: 3,
    tables: &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC],
};
const HAS_SEMANTICS: CodedIndex = CodedIndex {
    bits: 1,
    tables: &[EVENT, PROPERTY],
};
const METHOD_DEF_OR_REF: CodedIndex = CodedIndex {
    bits: 1,
    tables: &[METHOD_DEF, MEMBER_REF],
};
const MEMBER_FORWARDED: CodedIndex = CodedIndex {
    bits: 1,
    tables: &[FIELD, METHOD_DEF],
};
const CUSTOM_ATTRIBUTE_TYPE: CodedIndex = CodedIndex {
    bits: 3,
    tables: &[METHOD_DEF, MEMBER_REF],
};
const RESOLUTION_SCOPE: CodedIndex = CodedIndex {
    bits: 2,
    tables: &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF],
};

#[derive(Clone, Copy)]
enum Col {
    Fixed(usize),
    Str,
    Guid,
    Blob,
    Table(usize),
    Coded(&'static CodedIndex),
}

use Col::{Blob, Coded, Fixed, Guid, Str, Table};

/// Column layout of every table up to and including AssemblyRef
const TABLE_SCHEMAS: [&[Col]; ASSEMBLY_REF + 1] = [
    // 0x00 Module
    &[Fixed(2), Str, Guid, Guid, Guid],
    // 0x01 TypeRef
    &[Coded(&RESOLUTION_SCOPE), Str, Str],
    // 0x02 TypeDef
    &[Fixed(4), Str, Str, Coded(&TYPE_DEF_OR_REF), Table(FIELD), Table(METHOD_DEF)],
    // 0x03 FieldPtr
    &[Table(FIELD)],
    // 0x04 Field
    &[Fixed(2), Str, Blob],
    // 0x05 MethodPtr
    &[Table(METHOD_DEF)],
    // 0x06 MethodDef
    &[Fixed(4), Fixed(2), Fixed(2), Str, Blob, Table(PARAM)],
    // 0x07 ParamPtr
    &[Table(PARAM)],
    // 0x08 Param
    &[Fixed(2), Fixed(2), Str],
    // 0x09 InterfaceImpl
    &[Table(TYPE_DEF), Coded(&TYPE_DEF_OR_REF)],
    // 0x0A MemberRef
    &[Coded(&MEMBER_REF_PARENT), Str, Blob],
    // 0x0B Constant (type byte plus padding)
    &[Fixed(2), Coded(&HAS_CONSTANT), Blob],
    // 0x0C CustomAttribute
    &[Coded(&HAS_CUSTOM_ATTRIBUTE), Coded(&CUSTOM_ATTRIBUTE_TYPE), Blob],
    // 0x0D FieldMarshal
    &[Coded(&HAS_FIELD_MARSHAL), Blob],
    // 0x0E DeclSecurity
    &[Fixed(2), Coded(&HAS_DECL_SECURITY), Blob],
    // 0x0F ClassLayout
    &[Fixed(2), Fixed(4), Table(TYPE_DEF)],
    // 0x10 FieldLayout
    &[Fixed(4), Table(FIELD)],
    // 0x11 StandAloneSig
    &[Blob],
    // 0x12 EventMap
    &[Table(TYPE_DEF), Table(EVENT)],
    // 0x13 EventPtr
    &[Table(EVENT)],
    // 0x14 Event
    &[Fixed(2), Str, Coded(&TYPE_DEF_OR_REF)],
    // 0x15 PropertyMap
    &[Table(TYPE_DEF), Table(PROPERTY)],
    // 0x16 PropertyPtr
    &[Table(PROPERTY)],
    // 0x17 Property
    &[Fixed(2), Str, Blob],
    // 0x18 MethodSemantics
    &[Fixed(2), Table(METHOD_DEF), Coded(&HAS_SEMANTICS)],
    // 0x19 MethodImpl
    &[Table(TYPE_DEF), Coded(&METHOD_DEF_OR_REF), Coded(&METHOD_DEF_OR_REF)],
    // 0x1A ModuleRef
    &[Str],
    // 0x1B TypeSpec
    &[Blob],
    // 0x1C ImplMap
    &[Fixed(2), Coded(&MEMBER_FORWARDED), Str, Table(MODULE_REF)],
    // 0x1D FieldRVA
    &[Fixed(4), Table(FIELD)],
    // 0x1E EncLog
    &[Fixed(4), Fixed(4)],
    // 0x1F EncMap
    &[Fixed(4)],
    // 0x20 Assembly
    &[Fixed(4), Fixed(2), Fixed(2), Fixed(2), Fixed(2), Fixed(4), Blob, Str, Str],
    // 0x21 AssemblyProcessor
    &[Fixed(4)],
    // 0x22 AssemblyOS
    &[Fixed(4), Fixed(4), Fixed(4)],
    // 0x23 AssemblyRef
    &[Fixed(2), Fixed(2), Fixed(2), Fixed(2), Fixed(4), Blob, Str, Str, Blob],
];

/// Row sizes depend on heap widths and row counts of referenced tables
struct Layout {
    rows: [u32; 64],
    heap_sizes: u8,
}

impl Layout {
    fn heap_width(&self, flag: u8) -> usize {
        if self.heap_sizes & flag != 0 { 4 } else { 2 }
    }

    fn col_size(&self, col: Col) -> usize {
        match col {
            Fixed(size) => size,
            Str => self.heap_width(WIDE_STRINGS),
            Guid => self.heap_width(WIDE_GUIDS),
            Blob => self.heap_width(WIDE_BLOBS),
            Table(table) => {
                if self.rows[table] < 0x1_0000 { 2 } else { 4 }
            }
            Coded(coded) => {
                let max_rows = coded
                    .tables
                    .iter()
                    .map(|table| self.rows[*table])
                    .max()
                    .unwrap_or(0);
                if max_rows < (1u32 << (16 - coded.bits)) { 2 } else { 4 }
            }
        }
    }

    fn row_size(&self, table: usize) -> usize {
        TABLE_SCHEMAS[table].iter().map(|col| self.col_size(*col)).sum()
    }

    fn column_offset(&self, table: usize, column: usize) -> usize {
        TABLE_SCHEMAS[table][..column]
            .iter()
            .map(|col| self.col_size(*col))
            .sum()
    }

    /// String heap index stored in `column` of a row of `table`
    fn string_index(&self, row: &[u8], table: usize, column: usize) -> Parse<u32> {
        let width = self.col_size(TABLE_SCHEMAS[table][column]);
        let mut offset = self.column_offset(table, column);
        read_index(row, &mut offset, width)
    }
}

struct StringHeap<'a>(&'a [u8]);

impl StringHeap<'_> {
    fn get(&self, index: u32) -> Parse<String> {
        let text = self.0.pread::<&str>(index as usize)?;
        Ok(text.to_string())
    }
}

/// Decode a metadata root (the `BSJB` blob) into a module handle
pub fn parse_metadata(root: &[u8], options: ReadOptions) -> Parse<ModuleHandle> {
    let mut offset = 0;
    let signature = StorageSignature::parse(root, &mut offset)?;
    if !signature.is_valid() {
        return Err(malformed(format!(
            "bad metadata signature {:#x}",
            signature.signature
        )));
    }
    let header = root.gread_with::<StorageHeader>(&mut offset, LE)?;

    let mut tables = None;
    let mut strings = None;
    for _ in 0..header.streams {
        let stream = StorageStream::parse(root, &mut offset)?;
        let data = root
            .pread_with::<&[u8]>(stream.offset as usize, stream.size as usize)
            .map_err(|_| malformed(format!("stream {} out of bounds", stream.name)))?;
        match stream.name {
            "#~" | "#-" => tables = Some(data),
            "#Strings" => strings = Some(data),
            _ => {}
        }
    }

    let tables = tables.ok_or_else(|| malformed("missing table stream".to_string()))?;
    let strings =
        StringHeap(strings.ok_or_else(|| malformed("missing #Strings heap".to_string()))?);
    read_tables(tables, &strings, options)
}

fn read_tables(stream: &[u8], strings: &StringHeap<'_>, options: ReadOptions) -> Parse<ModuleHandle> {
    // reserved, major, minor
    let mut offset = 6;
    let heap_sizes = stream.gread_with::<u8>(&mut offset, LE)?;
    offset += 1;
    let valid = stream.gread_with::<u64>(&mut offset, LE)?;
    // sorted
    offset += 8;

    let mut rows = [0u32; 64];
    for (table, count) in rows.iter_mut().enumerate() {
        if valid & (1u64 << table) != 0 {
            *count = stream.gread_with::<u32>(&mut offset, LE)?;
        }
    }
    if heap_sizes & EXTRA_DATA != 0 {
        offset += 4;
    }

    let layout = Layout { rows, heap_sizes };
    let mut assembly_name = None;
    let mut references = Vec::new();

    for table in 0..=ASSEMBLY_REF {
        let count = layout.rows[table] as usize;
        if count == 0 {
            continue;
        }
        let row_size = layout.row_size(table);
        let size = row_size
            .checked_mul(count)
            .ok_or_else(|| malformed(format!("table {:#x} size overflow", table)))?;
        let data = stream.gread_with::<&[u8]>(&mut offset, size)?;

        match table {
            ASSEMBLY if !options.minimal => {
                let index = layout.string_index(&data[..row_size], ASSEMBLY, ASSEMBLY_NAME_COLUMN)?;
                assembly_name = Some(strings.get(index)?);
            }
            ASSEMBLY_REF => {
                for row in data.chunks_exact(row_size) {
                    let index = layout.string_index(row, ASSEMBLY_REF, ASSEMBLY_REF_NAME_COLUMN)?;
                    references.push(strings.get(index)?);
                }
            }
            _ => {}
        }
    }

    Ok(ModuleHandle::new(assembly_name, references))
}

/// The metadata root of a managed image, `None` for native images
fn locate_metadata<'a>(bytes: &'a [u8], pe: &PE<'_>) -> Parse<Option<&'a [u8]>> {
    let Some(clr) = pe.clr_data.as_ref() else {
        return Ok(None);
    };
    if !clr.is_valid() {
        return Err(malformed(format!(
            "bad metadata signature {:#x}",
            clr.signature
        )));
    }

    // goblin keeps the COR20 metadata directory; map it to the root ourselves
    let directory = clr.cor20_header.metadata;
    let file_alignment = pe
        .header
        .optional_header
        .as_ref()
        .map_or(DEFAULT_FILE_ALIGNMENT, |header| header.windows_fields.file_alignment);
    let offset = find_offset(
        directory.virtual_address as usize,
        &pe.sections,
        file_alignment,
        &ParseOptions::default(),
    )
    .ok_or_else(|| malformed("metadata outside of any section".to_string()))?;

    bytes
        .pread_with::<&[u8]>(offset, directory.size as usize)
        .map(Some)
        .map_err(|_| malformed("metadata extends past end of file".to_string()))
}

/// Reads assembly references out of managed PE files
#[derive(Debug, Clone, Copy, Default)]
pub struct ClrMetadataReader;

impl ClrMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ClrMetadataReader {
    fn open(&self, path: &Path, options: ReadOptions) -> Result<ModuleHandle, MetadataError> {
        let bytes = fs::read(path)?;
        let display = path.display().to_string();

        let pe = match Object::parse(&bytes) {
            Ok(Object::PE(pe)) => pe,
            _ => return Err(MetadataError::NotPortableExecutable { path: display }),
        };

        let malformed = |e: GoblinError| MetadataError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let root = locate_metadata(&bytes, &pe)
            .map_err(malformed)?
            .ok_or(MetadataError::NotManaged { path: display })?;

        parse_metadata(root, options).map_err(malformed)
    }
}
