use lens_core::model::{Binary, Section, Symbol};
use serde_json::{json, Value};

/// One-line load summary printed to stderr after a successful load.
pub fn summary_line(bin: &Binary) -> String {
    format!(
        "loaded binary '{}' {}/{} ({} bits) entry@{:#018x}",
        bin.filename.display(),
        bin.type_str,
        bin.arch_str,
        bin.bits,
        bin.entry
    )
}

/// Listing row for one section.
pub fn section_line(sec: &Section) -> String {
    format!(
        "  0x{:016x} {:<8} {:<20} {}",
        sec.vma, sec.size, sec.name, sec.kind
    )
}

/// Listing row for one symbol.
pub fn symbol_line(sym: &Symbol) -> String {
    format!("  {:<40} 0x{:016x} {}", sym.name, sym.addr, sym.kind)
}

/// Machine-readable load report for `--json`.
///
/// Section byte contents are left out: the report describes the shape of
/// the binary, not its full payload.
pub fn load_report(bin: &Binary) -> Value {
    let sections: Vec<Value> = bin
        .sections
        .iter()
        .map(|sec| {
            json!({
                "name": sec.name,
                "kind": sec.kind,
                "vma": sec.vma,
                "size": sec.size,
            })
        })
        .collect();

    json!({
        "binary": {
            "filename": bin.filename.display().to_string(),
            "format": bin.format,
            "type": bin.type_str,
            "arch": bin.arch,
            "arch_str": bin.arch_str,
            "bits": bin.bits,
            "entry": bin.entry,
        },
        "sections": sections,
        "symbols": bin.symbols,
    })
}
