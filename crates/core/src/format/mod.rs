//! Container-adapter seam between on-disk formats and the loader.
//!
//! A [`FormatAdapter`] hides everything container-specific behind a small
//! contract: report the flavor and machine, enumerate raw sections and
//! symbol tables, and serve section content reads. The loader consumes this
//! contract only, so the goblin-backed production adapter and the scripted
//! fixture adapter are interchangeable.

use std::fmt;

use thiserror::Error;

pub mod fixture;
pub mod goblin;

/// Container flavor as probed by an adapter.
///
/// `MachO` and `Archive` are containers the adapter can recognize but the
/// loader does not support; `Unknown` means the probe could not settle on a
/// flavor at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Elf,
    Pe,
    MachO,
    Archive,
    Unknown,
}

impl Flavor {
    pub fn name(&self) -> &'static str {
        match self {
            Flavor::Elf => "ELF",
            Flavor::Pe => "PE",
            Flavor::MachO => "Mach-O",
            Flavor::Archive => "archive",
            Flavor::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Machine type reported by an adapter, normalized across containers.
///
/// ELF `e_machine` and COFF machine codes live in different number spaces;
/// the adapter folds both into this enum and keeps the raw code for
/// anything unrecognized so diagnostics can name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    /// 32-bit x86 (ELF `EM_386`, COFF `IMAGE_FILE_MACHINE_I386`).
    I386,
    /// 64-bit x86 (ELF `EM_X86_64`, COFF `IMAGE_FILE_MACHINE_AMD64`).
    Amd64,
    Other(u32),
}

impl Machine {
    /// Human-readable architecture name, used for `Binary::arch_str` and
    /// for unsupported-architecture diagnostics.
    pub fn printable_name(&self) -> String {
        match self {
            Machine::I386 => "i386".to_string(),
            Machine::Amd64 => "x86-64".to_string(),
            Machine::Other(code) => format!("unknown ({code:#x})"),
        }
    }
}

bitflags::bitflags! {
    /// Purpose flags an adapter computes from container section attributes.
    ///
    /// Both bits may be set (PE allows it); classification precedence is
    /// the loader's call, not the adapter's.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        const CODE = 1 << 0;
        const DATA = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Flags an adapter attaches to raw symbol-table entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFlags: u8 {
        const FUNCTION = 1 << 0;
    }
}

/// One raw section descriptor in the adapter's native order.
///
/// `index` is the adapter-scoped handle passed back to
/// [`FormatAdapter::read_section_into`]; nothing outside the adapter
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub index: usize,
    /// `None` when the container entry carries no name; the loader
    /// substitutes a placeholder.
    pub name: Option<String>,
    pub vma: u64,
    pub size: u64,
    pub flags: SectionFlags,
}

/// One raw symbol-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol {
    /// May be empty for nameless entries; the loader keeps them as-is.
    pub name: String,
    pub value: u64,
    pub flags: SymbolFlags,
}

/// Failures surfaced by an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A table or section declares a size or offset that cannot be
    /// satisfied by the underlying file.
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("{0}")]
    Malformed(String),
}

/// Contract between the loader and a container decoder.
///
/// An adapter is fully open once constructed: metadata queries are
/// infallible, symbol-table reads and section-content reads are the points
/// where faults surface. Dropping the adapter closes it.
pub trait FormatAdapter: Send + Sync {
    fn flavor(&self) -> Flavor;

    /// Human-readable container name, e.g. `ELF64` or `PE32+`. The default
    /// is the bare flavor name.
    fn flavor_name(&self) -> String {
        self.flavor().name().to_string()
    }

    fn machine(&self) -> Machine;

    fn entry_point(&self) -> u64;

    /// Raw section descriptors in the container's native order.
    fn sections(&self) -> Vec<RawSection>;

    /// Entries of the static (link-time) symbol table. A container without
    /// one reports `Ok` with an empty table.
    fn static_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError>;

    /// Entries of the dynamic (load-time) symbol table. A container without
    /// one reports `Ok` with an empty table.
    fn dynamic_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError>;

    /// Fill `buf` with the section's content starting at offset 0. `buf`
    /// is exactly `section.size` bytes; a zero-size section is a no-op.
    fn read_section_into(&self, section: &RawSection, buf: &mut [u8]) -> Result<(), AdapterError>;
}
