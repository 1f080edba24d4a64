//! lens-core
//!
//! Core library for loading ELF/PE binaries into a format-agnostic model.
//!
//! This crate defines the normalized binary model (sections, symbols,
//! architecture metadata), the format-adapter seam with its goblin-backed
//! production adapter, the loader that drives normalization, and the
//! capstone-backed disassembly engine that consumes the model.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, service embedding, etc.).

pub mod model;
pub mod format;
pub mod loader;
pub mod disasm;
pub mod logging;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
