//! Disassembly of materialized code sections.
//!
//! The engine consumes what the loader produced: an architecture tag, a
//! word size, an owned byte span, and the span's base virtual address. It
//! yields decoded instruction records through a consuming iterator.

use std::fmt;

use thiserror::Error;

pub mod capstone;

pub use self::capstone::{disassemble, engine_version};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u64,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
    pub op_str: String,
}

impl fmt::Display for Instruction {
    /// Classic dump line: padded hex address, raw bytes, mnemonic, operands.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}: ", self.address)?;
        for byte in &self.bytes {
            write!(f, "{byte:02x} ")?;
        }
        write!(f, "{:<12} {}", self.mnemonic, self.op_str)
    }
}

/// Decode failure.
#[derive(Debug, Error)]
pub enum DisasmError {
    #[error("Unsupported architecture for disassembly: {0}")]
    UnsupportedArch(String),
    #[error("Disassembly engine error: {0}")]
    Engine(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Instructions decoded from one span.
///
/// A finite sequence consumed as it is read; once exhausted it cannot be
/// restarted. Call [`disassemble`] again to decode the span anew.
#[derive(Debug)]
pub struct Disassembly {
    instructions: std::vec::IntoIter<Instruction>,
}

impl Disassembly {
    pub(crate) fn new(instructions: Vec<Instruction>) -> Self {
        Disassembly { instructions: instructions.into_iter() }
    }

    /// Number of instructions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.instructions.len()
    }
}

impl Iterator for Disassembly {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        self.instructions.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.instructions.size_hint()
    }
}

impl ExactSizeIterator for Disassembly {}
