//! Scripted in-memory [`FormatAdapter`] for deterministic loader runs.
//!
//! Every piece of metadata the contract exposes is caller-supplied, and
//! each stage can be made to fail on demand (symbol-table size/read
//! faults, per-section content faults). Loader tests use this to reach
//! error paths the goblin adapter only hits on genuinely corrupt files.

use super::{
    AdapterError, Flavor, FormatAdapter, Machine, RawSection, RawSymbol, SectionFlags, SymbolFlags,
};

/// Injected symbol-table failure.
#[derive(Debug, Clone)]
pub enum TableFault {
    /// The table reports an impossible size (maps to `AdapterError::InvalidSize`).
    InvalidSize(String),
    /// The table exists but reading it fails (maps to `AdapterError::Malformed`).
    Read(String),
}

#[derive(Debug, Clone)]
enum TableScript {
    Entries(Vec<RawSymbol>),
    Fault(TableFault),
}

impl TableScript {
    fn resolve(&self) -> Result<Vec<RawSymbol>, AdapterError> {
        match self {
            TableScript::Entries(entries) => Ok(entries.clone()),
            TableScript::Fault(TableFault::InvalidSize(msg)) => {
                Err(AdapterError::InvalidSize(msg.clone()))
            }
            TableScript::Fault(TableFault::Read(msg)) => Err(AdapterError::Malformed(msg.clone())),
        }
    }

    fn push(&mut self, symbol: RawSymbol) {
        if let TableScript::Entries(entries) = self {
            entries.push(symbol);
        }
    }
}

#[derive(Debug, Clone)]
struct FixtureSection {
    name: Option<String>,
    vma: u64,
    size: u64,
    flags: SectionFlags,
    bytes: Vec<u8>,
    read_fault: Option<String>,
}

/// In-memory adapter with fully scripted contents.
#[derive(Debug, Clone)]
pub struct FixtureAdapter {
    flavor: Flavor,
    flavor_name: Option<String>,
    machine: Machine,
    entry: u64,
    sections: Vec<FixtureSection>,
    static_table: TableScript,
    dynamic_table: TableScript,
}

impl FixtureAdapter {
    pub fn new(flavor: Flavor, machine: Machine) -> Self {
        FixtureAdapter {
            flavor,
            flavor_name: None,
            machine,
            entry: 0,
            sections: Vec::new(),
            static_table: TableScript::Entries(Vec::new()),
            dynamic_table: TableScript::Entries(Vec::new()),
        }
    }

    /// 64-bit x86 ELF fixture, the common case in tests.
    pub fn elf_x86_64() -> Self {
        Self::new(Flavor::Elf, Machine::Amd64).with_flavor_name("ELF64")
    }

    /// 32-bit x86 ELF fixture.
    pub fn elf_x86() -> Self {
        Self::new(Flavor::Elf, Machine::I386).with_flavor_name("ELF32")
    }

    /// 64-bit x86 PE fixture.
    pub fn pe_x86_64() -> Self {
        Self::new(Flavor::Pe, Machine::Amd64).with_flavor_name("PE32+")
    }

    pub fn with_flavor_name(mut self, name: impl Into<String>) -> Self {
        self.flavor_name = Some(name.into());
        self
    }

    pub fn with_entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    /// Add a section with explicit purpose flags; `size` is the byte
    /// count of `bytes`. Pass `None` as the name to exercise the loader's
    /// placeholder substitution.
    pub fn with_flagged_section(
        mut self,
        name: Option<&str>,
        vma: u64,
        flags: SectionFlags,
        bytes: Vec<u8>,
    ) -> Self {
        self.sections.push(FixtureSection {
            name: name.map(str::to_string),
            vma,
            size: bytes.len() as u64,
            flags,
            bytes,
            read_fault: None,
        });
        self
    }

    pub fn with_code_section(self, name: &str, vma: u64, bytes: Vec<u8>) -> Self {
        self.with_flagged_section(Some(name), vma, SectionFlags::CODE, bytes)
    }

    pub fn with_data_section(self, name: &str, vma: u64, bytes: Vec<u8>) -> Self {
        self.with_flagged_section(Some(name), vma, SectionFlags::DATA, bytes)
    }

    /// Add a code section whose content read fails with `reason`.
    pub fn with_failing_section(mut self, name: &str, vma: u64, size: u64, reason: &str) -> Self {
        self.sections.push(FixtureSection {
            name: Some(name.to_string()),
            vma,
            size,
            flags: SectionFlags::CODE,
            bytes: Vec::new(),
            read_fault: Some(reason.to_string()),
        });
        self
    }

    /// Add a code section that declares `size` bytes with no backing
    /// content, for driving allocation failure in the loader.
    pub fn with_oversized_section(mut self, name: &str, vma: u64, size: u64) -> Self {
        self.sections.push(FixtureSection {
            name: Some(name.to_string()),
            vma,
            size,
            flags: SectionFlags::CODE,
            bytes: Vec::new(),
            read_fault: None,
        });
        self
    }

    pub fn with_static_symbol(mut self, symbol: RawSymbol) -> Self {
        self.static_table.push(symbol);
        self
    }

    pub fn with_dynamic_symbol(mut self, symbol: RawSymbol) -> Self {
        self.dynamic_table.push(symbol);
        self
    }

    pub fn with_static_function(self, name: &str, addr: u64) -> Self {
        self.with_static_symbol(RawSymbol {
            name: name.to_string(),
            value: addr,
            flags: SymbolFlags::FUNCTION,
        })
    }

    pub fn with_dynamic_function(self, name: &str, addr: u64) -> Self {
        self.with_dynamic_symbol(RawSymbol {
            name: name.to_string(),
            value: addr,
            flags: SymbolFlags::FUNCTION,
        })
    }

    pub fn fail_static_table(mut self, fault: TableFault) -> Self {
        self.static_table = TableScript::Fault(fault);
        self
    }

    pub fn fail_dynamic_table(mut self, fault: TableFault) -> Self {
        self.dynamic_table = TableScript::Fault(fault);
        self
    }
}

impl FormatAdapter for FixtureAdapter {
    fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn flavor_name(&self) -> String {
        self.flavor_name.clone().unwrap_or_else(|| self.flavor.name().to_string())
    }

    fn machine(&self) -> Machine {
        self.machine
    }

    fn entry_point(&self) -> u64 {
        self.entry
    }

    fn sections(&self) -> Vec<RawSection> {
        self.sections
            .iter()
            .enumerate()
            .map(|(index, sec)| RawSection {
                index,
                name: sec.name.clone(),
                vma: sec.vma,
                size: sec.size,
                flags: sec.flags,
            })
            .collect()
    }

    fn static_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError> {
        self.static_table.resolve()
    }

    fn dynamic_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError> {
        self.dynamic_table.resolve()
    }

    fn read_section_into(&self, section: &RawSection, buf: &mut [u8]) -> Result<(), AdapterError> {
        let sec = self.sections.get(section.index).ok_or_else(|| {
            AdapterError::Malformed(format!("unknown section handle {}", section.index))
        })?;
        if let Some(reason) = &sec.read_fault {
            return Err(AdapterError::Malformed(reason.clone()));
        }
        if buf.len() != sec.bytes.len() {
            return Err(AdapterError::InvalidSize(format!(
                "buffer holds {} bytes, section content is {}",
                buf.len(),
                sec.bytes.len()
            )));
        }
        buf.copy_from_slice(&sec.bytes);
        Ok(())
    }
}
