//! Normalized data model for a loaded binary.
//!
//! A [`Binary`] is the root aggregate produced by the loader: a format- and
//! architecture-resolved descriptor owning an ordered list of materialized
//! [`Section`]s and the [`Symbol`]s discovered in the container's symbol
//! tables. Downstream consumers (disassembly, listings, reports) only ever
//! see this model, never the container-specific representation.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name substituted for sections whose container entry carries no name.
pub const UNNAMED_SECTION: &str = "<unnamed>";

/// Container format of a successfully loaded binary.
///
/// There is no `Unknown` member: a `Binary` only exists after the loader
/// resolved the container, so an unresolved format is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryFormat {
    Elf,
    Pe,
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryFormat::Elf => write!(f, "ELF"),
            BinaryFormat::Pe => write!(f, "PE"),
        }
    }
}

/// Instruction-set family of a loaded binary.
///
/// Only the x86 family is supported; the 32/64-bit split lives in
/// [`Binary::bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86 => write!(f, "x86"),
        }
    }
}

/// Purpose of a materialized section.
///
/// Sections that are neither code nor data are dropped during loading, so
/// the model never holds an unclassified section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Code,
    Data,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Code => write!(f, "CODE"),
            SectionKind::Data => write!(f, "DATA"),
        }
    }
}

/// Classification of a symbol-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Unknown,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Unknown => write!(f, "UNK"),
            SymbolKind::Function => write!(f, "FUNC"),
        }
    }
}

/// One materialized section: metadata plus an owned copy of its bytes.
///
/// Invariants: `bytes.len() == size` (zero-size sections carry an empty
/// buffer), and the section never changes after the loader inserts it into
/// the owning [`Binary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub kind: SectionKind,
    pub vma: u64,
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl Section {
    /// Whether `addr` falls inside this section's virtual address range.
    ///
    /// Holds iff `vma <= addr < vma + size`; a zero-size section contains
    /// no address. The subtraction form cannot overflow for sections mapped
    /// at the top of the address space.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.vma && addr - self.vma < self.size
    }
}

/// One symbol retained from a container symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub addr: u64,
}

/// The root aggregate: a fully loaded, format-agnostic view of one binary.
///
/// `sections` preserves the container's native section order; `symbols`
/// preserves discovery order, with every static-table entry preceding every
/// dynamic-table entry. Neither sequence is deduplicated. The binary
/// exclusively owns every section buffer; teardown is `Drop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub filename: PathBuf,
    pub format: BinaryFormat,
    /// Human-readable container name as reported by the adapter, e.g.
    /// `ELF64` or `PE32+`.
    pub type_str: String,
    pub arch: Arch,
    /// Human-readable architecture name, e.g. `i386` or `x86-64`.
    pub arch_str: String,
    pub bits: u8,
    pub entry: u64,
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

impl Binary {
    /// First section with the given name, in container order. Duplicate
    /// names are legal; first match wins.
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|sec| sec.name == name)
    }

    /// Shorthand for the first section named `.text`.
    pub fn text_section(&self) -> Option<&Section> {
        self.section_by_name(".text")
    }

    /// First section whose address range contains `addr`.
    pub fn section_containing(&self, addr: u64) -> Option<&Section> {
        self.sections.iter().find(|sec| sec.contains(addr))
    }
}
