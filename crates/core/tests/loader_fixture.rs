use std::path::Path;

use lens_core::format::fixture::{FixtureAdapter, TableFault};
use lens_core::format::{Flavor, Machine, RawSymbol, SectionFlags, SymbolFlags};
use lens_core::loader::{load_from_adapter, FormatHint, LoadError};
use lens_core::model::{Arch, Binary, BinaryFormat, SectionKind, SymbolKind, UNNAMED_SECTION};

fn load(adapter: &FixtureAdapter) -> Binary {
    load_from_adapter(Path::new("fixture.bin"), adapter, FormatHint::Auto)
        .expect("fixture load should succeed")
}

fn load_err(adapter: &FixtureAdapter, hint: FormatHint) -> LoadError {
    load_from_adapter(Path::new("fixture.bin"), adapter, hint).expect_err("load should fail")
}

#[test]
fn loads_a_small_executable_image_end_to_end() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_entry(0x400000)
        .with_code_section(".text", 0x400000, vec![0x90; 0x1000])
        .with_data_section(".data", 0x401000, vec![0xAA; 0x200])
        .with_static_function("main", 0x400000)
        .with_static_function("helper", 0x400200)
        .with_dynamic_function("printf", 0x400300);

    let bin = load(&adapter);

    assert_eq!(bin.filename, Path::new("fixture.bin"));
    assert_eq!(bin.format, BinaryFormat::Elf);
    assert_eq!(bin.type_str, "ELF64");
    assert_eq!(bin.arch, Arch::X86);
    assert_eq!(bin.arch_str, "x86-64");
    assert_eq!(bin.bits, 64);
    assert_eq!(bin.entry, 0x400000);

    assert_eq!(bin.sections.len(), 2);
    let text = &bin.sections[0];
    assert_eq!(text.name, ".text");
    assert_eq!(text.kind, SectionKind::Code);
    assert_eq!(text.vma, 0x400000);
    assert_eq!(text.size, 0x1000);
    assert_eq!(text.bytes.len(), 0x1000);
    assert!(text.contains(0x400500));

    let data = &bin.sections[1];
    assert_eq!(data.name, ".data");
    assert_eq!(data.kind, SectionKind::Data);
    assert_eq!(data.vma, 0x401000);
    assert_eq!(data.bytes, vec![0xAA; 0x200]);

    assert_eq!(bin.symbols.len(), 3);
    assert!(bin.symbols.iter().all(|sym| sym.kind == SymbolKind::Function));
    assert_eq!(bin.symbols[0].name, "main");
    assert_eq!(bin.symbols[0].addr, 0x400000);
    assert_eq!(bin.symbols[1].name, "helper");
    assert_eq!(bin.symbols[2].name, "printf");
    assert_eq!(bin.symbols[2].addr, 0x400300);
}

#[test]
fn static_symbols_precede_dynamic_symbols() {
    // Registered dynamic-first to show the loader orders by table, not
    // by registration.
    let adapter = FixtureAdapter::elf_x86_64()
        .with_dynamic_function("dyn_fn", 0x2000)
        .with_static_function("static_fn", 0x1000);

    let bin = load(&adapter);

    let names: Vec<&str> = bin.symbols.iter().map(|sym| sym.name.as_str()).collect();
    assert_eq!(names, vec!["static_fn", "dyn_fn"]);
}

#[test]
fn non_function_symbols_are_filtered_out() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_static_function("fn_a", 0x1000)
        .with_static_symbol(RawSymbol {
            name: "a_global_object".to_string(),
            value: 0x2000,
            flags: SymbolFlags::empty(),
        })
        .with_dynamic_symbol(RawSymbol {
            name: "a_tls_slot".to_string(),
            value: 0x3000,
            flags: SymbolFlags::empty(),
        });

    let bin = load(&adapter);

    assert_eq!(bin.symbols.len(), 1);
    assert_eq!(bin.symbols[0].name, "fn_a");
}

#[test]
fn empty_symbol_tables_load_cleanly() {
    let adapter = FixtureAdapter::elf_x86_64().with_code_section(".text", 0x1000, vec![0xC3]);

    let bin = load(&adapter);

    assert!(bin.symbols.is_empty());
    assert_eq!(bin.sections.len(), 1);
}

#[test]
fn sections_with_both_flags_classify_as_code() {
    let adapter = FixtureAdapter::elf_x86_64().with_flagged_section(
        Some(".mixed"),
        0x1000,
        SectionFlags::CODE | SectionFlags::DATA,
        vec![1, 2, 3],
    );

    let bin = load(&adapter);

    assert_eq!(bin.sections.len(), 1);
    assert_eq!(bin.sections[0].kind, SectionKind::Code);
}

#[test]
fn sections_with_neither_flag_are_dropped() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_flagged_section(Some(".debug_info"), 0, SectionFlags::empty(), vec![9; 16])
        .with_code_section(".text", 0x1000, vec![0xC3]);

    let bin = load(&adapter);

    assert_eq!(bin.sections.len(), 1);
    assert_eq!(bin.sections[0].name, ".text");
}

#[test]
fn unnamed_sections_get_the_placeholder_name() {
    let adapter =
        FixtureAdapter::elf_x86_64().with_flagged_section(None, 0x2000, SectionFlags::DATA, vec![0; 8]);

    let bin = load(&adapter);

    assert_eq!(bin.sections[0].name, UNNAMED_SECTION);
    assert_eq!(bin.sections[0].name, "<unnamed>");
}

#[test]
fn zero_size_sections_are_kept_with_empty_buffers() {
    let adapter = FixtureAdapter::elf_x86_64().with_data_section(".stub", 0x3000, Vec::new());

    let bin = load(&adapter);

    let sec = &bin.sections[0];
    assert_eq!(sec.size, 0);
    assert!(sec.bytes.is_empty());
    assert!(!sec.contains(0x3000));
}

#[test]
fn sections_keep_their_adapter_order() {
    let adapter = FixtureAdapter::elf_x86_64()
        .with_data_section(".rodata", 0x3000, vec![1])
        .with_code_section(".text", 0x1000, vec![0xC3])
        .with_data_section(".data", 0x2000, vec![2]);

    let bin = load(&adapter);

    let names: Vec<&str> = bin.sections.iter().map(|sec| sec.name.as_str()).collect();
    assert_eq!(names, vec![".rodata", ".text", ".data"]);
}

#[test]
fn thirty_two_bit_images_report_the_narrow_word_size() {
    let adapter = FixtureAdapter::elf_x86().with_code_section(".text", 0x8048000, vec![0xC3]);

    let bin = load(&adapter);

    assert_eq!(bin.bits, 32);
    assert_eq!(bin.arch, Arch::X86);
    assert_eq!(bin.arch_str, "i386");
    assert_eq!(bin.type_str, "ELF32");
}

#[test]
fn hint_mismatch_is_an_unsupported_format() {
    let adapter = FixtureAdapter::elf_x86_64().with_code_section(".text", 0x1000, vec![0xC3]);

    assert!(load_from_adapter(Path::new("fixture.bin"), &adapter, FormatHint::Elf).is_ok());

    let err = load_err(&adapter, FormatHint::Pe);
    assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    assert!(err.to_string().contains("requested PE"), "unexpected error: {err}");
}

#[test]
fn recognized_foreign_containers_are_unsupported_formats() {
    for flavor in [Flavor::MachO, Flavor::Archive] {
        let adapter = FixtureAdapter::new(flavor, Machine::Amd64);
        let err = load_err(&adapter, FormatHint::Auto);
        assert!(matches!(err, LoadError::UnsupportedFormat(_)), "flavor {flavor} must be rejected");
        assert!(err.to_string().contains(flavor.name()), "unexpected error: {err}");
    }
}

#[test]
fn unknown_machines_are_rejected_before_any_table_work() {
    // EM_AARCH64; the poisoned table proves the arch check fires first.
    let adapter = FixtureAdapter::new(Flavor::Elf, Machine::Other(0xB7))
        .fail_static_table(TableFault::Read("must never be consulted".to_string()));

    let err = load_err(&adapter, FormatHint::Auto);
    assert!(matches!(err, LoadError::UnsupportedArch(_)));
    assert!(err.to_string().contains("0xb7"), "unexpected error: {err}");
}

#[test]
fn indeterminate_flavor_reports_an_open_error() {
    let adapter = FixtureAdapter::new(Flavor::Unknown, Machine::Amd64);

    let err = load_err(&adapter, FormatHint::Auto);
    assert!(matches!(err, LoadError::Open { .. }));
    assert!(err.to_string().contains("indeterminate"), "unexpected error: {err}");
}

#[test]
fn independent_loads_may_run_on_separate_threads() {
    let handles: Vec<_> = (0..4u64)
        .map(|index| {
            std::thread::spawn(move || {
                let vma = 0x1000 * (index + 1);
                let adapter = FixtureAdapter::elf_x86_64()
                    .with_code_section(".text", vma, vec![0xC3])
                    .with_static_function("main", vma);
                load_from_adapter(Path::new("fixture.bin"), &adapter, FormatHint::Auto)
                    .expect("concurrent load should succeed")
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let bin = handle.join().expect("loader thread panicked");
        assert_eq!(bin.sections[0].vma, 0x1000 * (index as u64 + 1));
        assert_eq!(bin.symbols.len(), 1);
    }
}
