//! Production [`FormatAdapter`] backed by the goblin parser.
//!
//! The adapter reads the whole file once, parses it, and eagerly folds the
//! container metadata into owned records (no goblin borrow survives
//! `open`). Section content reads are served from the retained file image.

use std::fs;
use std::path::Path;

use goblin::elf::{section_header, Elf};
use goblin::pe::{header as pe_header, section_table, PE};
use goblin::{elf, Object};
use tracing::debug;

use super::{
    AdapterError, Flavor, FormatAdapter, Machine, RawSection, RawSymbol, SectionFlags, SymbolFlags,
};

/// Owned extract of everything the loader will ask for.
struct Metadata {
    flavor: Flavor,
    flavor_name: String,
    machine: Machine,
    entry: u64,
    sections: Vec<SectionRecord>,
    static_syms: Vec<RawSymbol>,
    dynamic_syms: Vec<RawSymbol>,
}

/// Raw section descriptor plus the file range its content lives in.
struct SectionRecord {
    raw: RawSection,
    file_off: u64,
    file_len: u64,
}

pub struct GoblinAdapter {
    data: Vec<u8>,
    meta: Metadata,
}

impl GoblinAdapter {
    /// Open and probe a container file.
    ///
    /// Fails on unreadable files and on magic goblin cannot place at all.
    /// Recognized-but-unsupported containers (Mach-O, ar archives) open
    /// fine and report their flavor; rejecting those is the loader's call.
    pub fn open(path: &Path) -> Result<GoblinAdapter, AdapterError> {
        let data = fs::read(path)?;
        let meta = {
            let object = Object::parse(&data)
                .map_err(|err| AdapterError::Malformed(format!("unrecognized container: {err}")))?;
            match object {
                Object::Elf(elf) => extract_elf(&elf),
                Object::PE(pe) => extract_pe(&pe)?,
                Object::Mach(_) => unsupported(Flavor::MachO),
                Object::Archive(_) => unsupported(Flavor::Archive),
                _ => {
                    return Err(AdapterError::Malformed(
                        "unrecognized executable container".to_string(),
                    ))
                }
            }
        };
        debug!(
            "opened {} as {} ({} sections, {} static / {} dynamic symbols)",
            path.display(),
            meta.flavor_name,
            meta.sections.len(),
            meta.static_syms.len(),
            meta.dynamic_syms.len()
        );
        Ok(GoblinAdapter { data, meta })
    }
}

impl FormatAdapter for GoblinAdapter {
    fn flavor(&self) -> Flavor {
        self.meta.flavor
    }

    fn flavor_name(&self) -> String {
        self.meta.flavor_name.clone()
    }

    fn machine(&self) -> Machine {
        self.meta.machine
    }

    fn entry_point(&self) -> u64 {
        self.meta.entry
    }

    fn sections(&self) -> Vec<RawSection> {
        self.meta.sections.iter().map(|rec| rec.raw.clone()).collect()
    }

    fn static_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError> {
        Ok(self.meta.static_syms.clone())
    }

    fn dynamic_symbols(&self) -> Result<Vec<RawSymbol>, AdapterError> {
        Ok(self.meta.dynamic_syms.clone())
    }

    fn read_section_into(&self, section: &RawSection, buf: &mut [u8]) -> Result<(), AdapterError> {
        let rec = self.meta.sections.get(section.index).ok_or_else(|| {
            AdapterError::Malformed(format!("unknown section handle {}", section.index))
        })?;
        if buf.len() as u64 != rec.file_len {
            return Err(AdapterError::InvalidSize(format!(
                "buffer holds {} bytes, section content is {}",
                buf.len(),
                rec.file_len
            )));
        }
        if rec.file_len == 0 {
            return Ok(());
        }
        let start = usize::try_from(rec.file_off)
            .ok()
            .filter(|&start| start <= self.data.len())
            .ok_or_else(|| bad_range(rec, self.data.len()))?;
        let end = usize::try_from(rec.file_len)
            .ok()
            .and_then(|len| start.checked_add(len))
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| bad_range(rec, self.data.len()))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

fn bad_range(rec: &SectionRecord, file_len: usize) -> AdapterError {
    AdapterError::InvalidSize(format!(
        "section content at {:#x}+{:#x} exceeds file of {file_len} bytes",
        rec.file_off, rec.file_len
    ))
}

fn unsupported(flavor: Flavor) -> Metadata {
    Metadata {
        flavor,
        flavor_name: flavor.name().to_string(),
        machine: Machine::Other(0),
        entry: 0,
        sections: Vec::new(),
        static_syms: Vec::new(),
        dynamic_syms: Vec::new(),
    }
}

fn extract_elf(elf: &Elf) -> Metadata {
    let machine = match elf.header.e_machine {
        elf::header::EM_386 => Machine::I386,
        elf::header::EM_X86_64 => Machine::Amd64,
        other => Machine::Other(u32::from(other)),
    };

    let mut sections = Vec::new();
    for (index, sh) in elf.section_headers.iter().enumerate() {
        // SHT_NOBITS (.bss and friends) has no on-disk content and is
        // never code or data in the model.
        let mut flags = SectionFlags::empty();
        let nobits = sh.sh_type == section_header::SHT_NOBITS;
        if !nobits {
            if sh.sh_flags & u64::from(section_header::SHF_EXECINSTR) != 0 {
                flags |= SectionFlags::CODE;
            } else if sh.sh_flags & u64::from(section_header::SHF_ALLOC) != 0 {
                flags |= SectionFlags::DATA;
            }
        }
        let name = elf.shdr_strtab.get_at(sh.sh_name).map(str::to_string);
        sections.push(SectionRecord {
            raw: RawSection { index, name, vma: sh.sh_addr, size: sh.sh_size, flags },
            file_off: sh.sh_offset,
            file_len: if nobits { 0 } else { sh.sh_size },
        });
    }

    let mut static_syms = Vec::new();
    for sym in &elf.syms {
        let name = elf.strtab.get_at(sym.st_name).unwrap_or("").to_string();
        let mut flags = SymbolFlags::empty();
        if sym.is_function() {
            flags |= SymbolFlags::FUNCTION;
        }
        static_syms.push(RawSymbol { name, value: sym.st_value, flags });
    }

    let mut dynamic_syms = Vec::new();
    for sym in &elf.dynsyms {
        let name = elf.dynstrtab.get_at(sym.st_name).unwrap_or("").to_string();
        let mut flags = SymbolFlags::empty();
        if sym.is_function() {
            flags |= SymbolFlags::FUNCTION;
        }
        dynamic_syms.push(RawSymbol { name, value: sym.st_value, flags });
    }

    Metadata {
        flavor: Flavor::Elf,
        flavor_name: if elf.is_64 { "ELF64" } else { "ELF32" }.to_string(),
        machine,
        entry: elf.entry,
        sections,
        static_syms,
        dynamic_syms,
    }
}

fn extract_pe(pe: &PE) -> Result<Metadata, AdapterError> {
    let machine = match pe.header.coff_header.machine {
        pe_header::COFF_MACHINE_X86 => Machine::I386,
        pe_header::COFF_MACHINE_X86_64 => Machine::Amd64,
        other => Machine::Other(u32::from(other)),
    };
    let opt = pe.header.optional_header.ok_or_else(|| {
        AdapterError::Malformed("PE image lacks an optional header".to_string())
    })?;
    let image_base = opt.windows_fields.image_base;
    let entry = image_va(image_base, opt.standard_fields.address_of_entry_point)?;

    let mut sections = Vec::new();
    for (index, sec) in pe.sections.iter().enumerate() {
        // PE flags are independent bits; a section may be both code and
        // initialized data. Uninitialized data gets neither bit.
        let mut flags = SectionFlags::empty();
        if sec.characteristics & section_table::IMAGE_SCN_CNT_CODE != 0 {
            flags |= SectionFlags::CODE;
        }
        if sec.characteristics & section_table::IMAGE_SCN_CNT_INITIALIZED_DATA != 0 {
            flags |= SectionFlags::DATA;
        }
        let name = sec.name().ok().map(str::to_string);
        sections.push(SectionRecord {
            raw: RawSection {
                index,
                name,
                vma: image_va(image_base, u64::from(sec.virtual_address))?,
                size: u64::from(sec.size_of_raw_data),
                flags,
            },
            file_off: u64::from(sec.pointer_to_raw_data),
            file_len: u64::from(sec.size_of_raw_data),
        });
    }

    // Linked PE images rarely keep a COFF debug symbol table, so the
    // static table is empty; the export table plays the dynamic role.
    let mut dynamic_syms = Vec::new();
    for export in &pe.exports {
        let rva = export.rva as u64;
        if rva == 0 {
            continue;
        }
        let name = export.name.unwrap_or_default().to_string();
        let mut flags = SymbolFlags::empty();
        if rva_in_executable_section(pe, rva) {
            flags |= SymbolFlags::FUNCTION;
        }
        dynamic_syms.push(RawSymbol { name, value: image_va(image_base, rva)?, flags });
    }

    Ok(Metadata {
        flavor: Flavor::Pe,
        flavor_name: if pe.is_64 { "PE32+" } else { "PE32" }.to_string(),
        machine,
        entry,
        sections,
        static_syms: Vec::new(),
        dynamic_syms,
    })
}

/// Bias an RVA by the image base, rejecting sums that leave `u64`.
///
/// Both operands come straight from the container headers, so the sum is
/// not trusted to fit.
fn image_va(image_base: u64, rva: u64) -> Result<u64, AdapterError> {
    image_base.checked_add(rva).ok_or_else(|| {
        AdapterError::Malformed(format!(
            "PE virtual address {rva:#x} overflows the image base {image_base:#x}"
        ))
    })
}

fn rva_in_executable_section(pe: &PE, rva: u64) -> bool {
    pe.sections.iter().any(|sec| {
        let executable = sec.characteristics
            & (section_table::IMAGE_SCN_CNT_CODE | section_table::IMAGE_SCN_MEM_EXECUTE)
            != 0;
        if !executable {
            return false;
        }
        let start = u64::from(sec.virtual_address);
        let size = if sec.virtual_size == 0 {
            u64::from(sec.size_of_raw_data)
        } else {
            u64::from(sec.virtual_size)
        };
        rva >= start && rva - start < size
    })
}
