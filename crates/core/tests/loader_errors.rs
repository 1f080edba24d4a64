use std::path::Path;

use lens_core::format::fixture::{FixtureAdapter, TableFault};
use lens_core::loader::{load_binary, load_from_adapter, FormatHint, LoadError, SymbolTable};

fn load_err(adapter: &FixtureAdapter) -> LoadError {
    load_from_adapter(Path::new("fixture.bin"), adapter, FormatHint::Auto)
        .expect_err("load should fail")
}

#[test]
fn static_table_size_faults_map_to_symbol_size_errors() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_code_section(".text", 0x1000, vec![0xC3])
        .fail_static_table(TableFault::InvalidSize("negative table bound".to_string()));

    let err = load_err(&adapter);
    let message = err.to_string();

    match err {
        LoadError::SymbolSize { table, reason } => {
            assert_eq!(table, SymbolTable::Static);
            assert!(reason.contains("negative table bound"), "unexpected reason: {reason}");
        }
        other => panic!("expected a symbol sizing error, got {other}"),
    }
    assert!(
        message.contains("Failed to size the static symbol table"),
        "unexpected message: {message}"
    );
}

#[test]
fn dynamic_table_read_faults_map_to_symbol_read_errors() {
    // A healthy static table first; the failure must still abort the load.
    let adapter = FixtureAdapter::elf_x86_64()
        .with_code_section(".text", 0x1000, vec![0xC3])
        .with_static_function("main", 0x1000)
        .fail_dynamic_table(TableFault::Read("truncated dynsym".to_string()));

    let err = load_err(&adapter);
    let message = err.to_string();

    match err {
        LoadError::SymbolRead { table, reason } => {
            assert_eq!(table, SymbolTable::Dynamic);
            assert!(reason.contains("truncated dynsym"), "unexpected reason: {reason}");
        }
        other => panic!("expected a symbol read error, got {other}"),
    }
    assert!(
        message.contains("Failed to read the dynamic symbol table"),
        "unexpected message: {message}"
    );
}

#[test]
fn section_content_faults_map_to_section_read_errors() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_code_section(".text", 0x1000, vec![0xC3])
        .with_failing_section(".rodata", 0x2000, 0x100, "backing store went away");

    let err = load_err(&adapter);

    match err {
        LoadError::SectionRead { section, reason } => {
            assert_eq!(section, ".rodata");
            assert!(reason.contains("backing store went away"), "unexpected reason: {reason}");
        }
        other => panic!("expected a section read error, got {other}"),
    }
}

#[test]
fn absurd_section_sizes_report_out_of_memory() {
    let adapter = FixtureAdapter::elf_x86_64().with_oversized_section(".huge", 0x1000, u64::MAX);

    let err = load_err(&adapter);

    match err {
        LoadError::OutOfMemory { section, size } => {
            assert_eq!(section, ".huge");
            assert_eq!(size, u64::MAX);
        }
        other => panic!("expected an out-of-memory error, got {other}"),
    }
}

#[test]
fn a_failed_load_does_not_poison_later_loads() {
    let bad = FixtureAdapter::elf_x86_64()
        .fail_static_table(TableFault::Read("boom".to_string()));
    let good = FixtureAdapter::elf_x86_64().with_code_section(".text", 0x1000, vec![0xC3]);

    assert!(load_from_adapter(Path::new("bad.bin"), &bad, FormatHint::Auto).is_err());

    let bin = load_from_adapter(Path::new("good.bin"), &good, FormatHint::Auto)
        .expect("later load should succeed");
    assert_eq!(bin.sections.len(), 1);
}

#[test]
fn missing_files_report_an_open_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("does-not-exist");

    let err = load_binary(&path, FormatHint::Auto).expect_err("missing file must fail");

    assert!(matches!(err, LoadError::Open { .. }));
    assert!(err.to_string().contains("Failed to open binary"), "unexpected error: {err}");
}

#[test]
fn text_files_are_rejected_at_open_time() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("notes.txt");
    std::fs::write(&path, "just some prose, definitely not an executable\n").unwrap();

    let err = load_binary(&path, FormatHint::Auto).expect_err("text file must fail");

    match &err {
        LoadError::Open { reason, .. } => {
            assert!(reason.contains("unrecognized"), "unexpected reason: {reason}");
        }
        other => panic!("expected an open error, got {other}"),
    }
}

#[test]
fn truncated_containers_are_rejected_at_open_time() {
    // A valid ELF64 ident followed by far too few bytes for the header.
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("truncated.elf");
    let mut image = b"\x7fELF\x02\x01\x01\x00".to_vec();
    image.resize(48, 0xFF);
    std::fs::write(&path, image).unwrap();

    let err = load_binary(&path, FormatHint::Auto).expect_err("corrupt container must fail");

    assert!(matches!(err, LoadError::Open { .. }), "unexpected error: {err}");
}
