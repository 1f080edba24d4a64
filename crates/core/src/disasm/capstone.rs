//! Capstone-backed disassembly engine.

use capstone::arch::x86::ArchMode;
use capstone::prelude::*;
use capstone::Capstone;

use super::{DisasmError, Disassembly, Instruction};
use crate::model::Arch;

/// Version of the linked capstone library as `(major, minor)`.
pub fn engine_version() -> (u32, u32) {
    Capstone::lib_version()
}

fn make_cs(arch: Arch, bits: u8) -> Result<Capstone, DisasmError> {
    let mode = match (arch, bits) {
        (Arch::X86, 32) => ArchMode::Mode32,
        (Arch::X86, 64) => ArchMode::Mode64,
        (Arch::X86, other) => {
            return Err(DisasmError::UnsupportedArch(format!(
                "x86 with a {other}-bit word size"
            )))
        }
    };
    Capstone::new()
        .x86()
        .mode(mode)
        .build()
        .map_err(|err| DisasmError::Engine(format!("capstone init failed: {err}")))
}

/// Decode `code` as it would execute at `base_addr`.
///
/// Decoding zero instructions (empty span, or garbage from the first byte)
/// is a `Decode` error, not an empty sequence.
pub fn disassemble(
    arch: Arch,
    bits: u8,
    code: &[u8],
    base_addr: u64,
) -> Result<Disassembly, DisasmError> {
    let cs = make_cs(arch, bits)?;
    let insns = cs
        .disasm_all(code, base_addr)
        .map_err(|err| DisasmError::Engine(format!("capstone failed to disassemble: {err}")))?;
    if insns.is_empty() {
        return Err(DisasmError::Decode(format!("no instructions decoded at {base_addr:#x}")));
    }
    let decoded = insns
        .iter()
        .map(|insn| Instruction {
            address: insn.address(),
            bytes: insn.bytes().to_vec(),
            mnemonic: insn.mnemonic().unwrap_or("").to_string(),
            op_str: insn.op_str().unwrap_or("").to_string(),
        })
        .collect();
    Ok(Disassembly::new(decoded))
}
