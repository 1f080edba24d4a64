//! Loader: drives a [`FormatAdapter`] to build one normalized [`Binary`].
//!
//! The pipeline is synchronous and runs to completion or fails: resolve
//! flavor and machine, normalize the static then the dynamic symbol table,
//! materialize sections, assemble the model. Any stage failure aborts the
//! whole build; buffers acquired along the way are owned values and drop on
//! every exit path, so a failed load never leaks and never returns a
//! partial binary.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::format::goblin::GoblinAdapter;
use crate::format::{
    AdapterError, Flavor, FormatAdapter, Machine, RawSection, SectionFlags, SymbolFlags,
};
use crate::model::{
    Arch, Binary, BinaryFormat, Section, SectionKind, Symbol, SymbolKind, UNNAMED_SECTION,
};

/// Requested container type for a load. `Auto` asks the adapter to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatHint {
    #[default]
    Auto,
    Elf,
    Pe,
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatHint::Auto => write!(f, "auto"),
            FormatHint::Elf => write!(f, "ELF"),
            FormatHint::Pe => write!(f, "PE"),
        }
    }
}

/// Which symbol table a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolTable {
    Static,
    Dynamic,
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolTable::Static => write!(f, "static"),
            SymbolTable::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Structured load failure, one variant per failing stage.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open binary {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("Unsupported binary format: {0}")]
    UnsupportedFormat(String),
    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),
    #[error("Failed to size the {table} symbol table: {reason}")]
    SymbolSize { table: SymbolTable, reason: String },
    #[error("Failed to read the {table} symbol table: {reason}")]
    SymbolRead { table: SymbolTable, reason: String },
    #[error("Failed to read section {section}: {reason}")]
    SectionRead { section: String, reason: String },
    #[error("Out of memory materializing section {section} ({size} bytes)")]
    OutOfMemory { section: String, size: u64 },
}

/// Load a binary from disk through the goblin adapter.
pub fn load_binary(path: impl AsRef<Path>, hint: FormatHint) -> Result<Binary, LoadError> {
    let path = path.as_ref();
    let adapter = GoblinAdapter::open(path)
        .map_err(|err| LoadError::Open { path: path.to_path_buf(), reason: err.to_string() })?;
    load_from_adapter(path, &adapter, hint)
}

/// Build a [`Binary`] from an already-open adapter.
///
/// Public seam for alternative adapters, including the scripted fixture
/// adapter used in tests.
pub fn load_from_adapter(
    path: &Path,
    adapter: &dyn FormatAdapter,
    hint: FormatHint,
) -> Result<Binary, LoadError> {
    let format = match adapter.flavor() {
        Flavor::Elf => BinaryFormat::Elf,
        Flavor::Pe => BinaryFormat::Pe,
        Flavor::Unknown => {
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                reason: "indeterminate container flavor".to_string(),
            })
        }
        other => return Err(LoadError::UnsupportedFormat(other.name().to_string())),
    };
    let matches_hint = match hint {
        FormatHint::Auto => true,
        FormatHint::Elf => format == BinaryFormat::Elf,
        FormatHint::Pe => format == BinaryFormat::Pe,
    };
    if !matches_hint {
        return Err(LoadError::UnsupportedFormat(format!(
            "{} (requested {hint})",
            adapter.flavor_name()
        )));
    }

    let machine = adapter.machine();
    let (arch, bits) = match machine {
        Machine::I386 => (Arch::X86, 32),
        Machine::Amd64 => (Arch::X86, 64),
        Machine::Other(_) => return Err(LoadError::UnsupportedArch(machine.printable_name())),
    };
    debug!(
        "{}: {} {} {bits}-bit, entry {:#x}",
        path.display(),
        adapter.flavor_name(),
        machine.printable_name(),
        adapter.entry_point()
    );

    let mut symbols = Vec::new();
    normalize_symbols(adapter, SymbolTable::Static, &mut symbols)?;
    normalize_symbols(adapter, SymbolTable::Dynamic, &mut symbols)?;

    let sections = materialize_sections(adapter)?;

    Ok(Binary {
        filename: path.to_path_buf(),
        format,
        type_str: adapter.flavor_name(),
        arch,
        arch_str: machine.printable_name(),
        bits,
        entry: adapter.entry_point(),
        sections,
        symbols,
    })
}

/// Read one symbol table and append its function entries to `symbols`.
///
/// An absent table is success-with-nothing; entries without the function
/// flag are skipped silently.
fn normalize_symbols(
    adapter: &dyn FormatAdapter,
    table: SymbolTable,
    symbols: &mut Vec<Symbol>,
) -> Result<(), LoadError> {
    let raw = match table {
        SymbolTable::Static => adapter.static_symbols(),
        SymbolTable::Dynamic => adapter.dynamic_symbols(),
    }
    .map_err(|err| match err {
        AdapterError::InvalidSize(reason) => LoadError::SymbolSize { table, reason },
        other => LoadError::SymbolRead { table, reason: other.to_string() },
    })?;

    let before = symbols.len();
    for entry in raw {
        if entry.flags.contains(SymbolFlags::FUNCTION) {
            symbols.push(Symbol {
                kind: SymbolKind::Function,
                name: entry.name,
                addr: entry.value,
            });
        }
    }
    debug!("kept {} function symbols from the {table} table", symbols.len() - before);
    Ok(())
}

/// Classify and copy each retained section, preserving adapter order.
///
/// Code wins over data when both flags are set; sections with neither flag
/// are dropped from the model entirely. Every `Section` is completed
/// before it is pushed.
fn materialize_sections(adapter: &dyn FormatAdapter) -> Result<Vec<Section>, LoadError> {
    let mut sections = Vec::new();
    for raw in adapter.sections() {
        let kind = if raw.flags.contains(SectionFlags::CODE) {
            SectionKind::Code
        } else if raw.flags.contains(SectionFlags::DATA) {
            SectionKind::Data
        } else {
            continue;
        };
        let name = raw.name.clone().unwrap_or_else(|| UNNAMED_SECTION.to_string());
        let bytes = read_section_bytes(adapter, &raw, &name)?;
        trace!("materialized {kind} section {name} ({} bytes at {:#x})", raw.size, raw.vma);
        sections.push(Section { name, kind, vma: raw.vma, size: raw.size, bytes });
    }
    debug!("materialized {} sections", sections.len());
    Ok(sections)
}

/// Allocate exactly `raw.size` bytes and fill them from the adapter.
///
/// Zero-size sections produce an empty buffer. Allocation failure is
/// reported as `OutOfMemory` rather than aborting the process.
fn read_section_bytes(
    adapter: &dyn FormatAdapter,
    raw: &RawSection,
    name: &str,
) -> Result<Vec<u8>, LoadError> {
    let oom =
        || LoadError::OutOfMemory { section: name.to_string(), size: raw.size };
    let len = usize::try_from(raw.size).map_err(|_| oom())?;
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).map_err(|_| oom())?;
    bytes.resize(len, 0);
    adapter
        .read_section_into(raw, &mut bytes)
        .map_err(|err| LoadError::SectionRead { section: name.to_string(), reason: err.to_string() })?;
    Ok(bytes)
}
