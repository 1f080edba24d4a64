use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use binlens::{load_report, section_line, summary_line, symbol_line};
use clap::{Parser, ValueEnum};
use lens_core::loader::FormatHint;
use lens_core::model::Binary;

/// Binary loading and disassembly front-end.
///
/// This CLI is a thin wrapper around `lens-core` (exposed in code as `lens_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "binlens",
    version,
    about = "Load ELF/PE binaries into a uniform model and disassemble them",
    long_about = None
)]
struct Cli {
    /// Path to the binary to load.
    binary: PathBuf,

    /// Expected container format; `auto` detects it from the file.
    #[arg(long, value_enum, default_value = "auto")]
    format: FormatArg,

    /// Code section to disassemble when no listing flag is given.
    #[arg(long, default_value = ".text")]
    section: String,

    /// List the loaded sections.
    #[arg(long, default_value_t = false)]
    sections: bool,

    /// List the loaded function symbols.
    #[arg(long, default_value_t = false)]
    symbols: bool,

    /// Emit the whole load report as JSON instead of text output.
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Container formats accepted by `--format`.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    /// Detect the format from the file contents.
    Auto,
    /// Require an ELF executable or shared object.
    Elf,
    /// Require a PE image.
    Pe,
}

impl From<FormatArg> for FormatHint {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => FormatHint::Auto,
            FormatArg::Elf => FormatHint::Elf,
            FormatArg::Pe => FormatHint::Pe,
        }
    }
}

fn main() -> Result<()> {
    lens_core::logging::init();
    let cli = Cli::parse();

    let bin = lens_core::loader::load_binary(&cli.binary, cli.format.into())?;
    eprintln!("{}", summary_line(&bin));

    if cli.json {
        return json_command(&bin);
    }

    let mut handled = false;
    if cli.sections {
        sections_command(&bin);
        handled = true;
    }
    if cli.symbols {
        symbols_command(&bin);
        handled = true;
    }
    if handled {
        return Ok(());
    }

    disasm_command(&bin, &cli.section)
}

/// Print the JSON load report to stdout.
fn json_command(bin: &Binary) -> Result<()> {
    let report = load_report(bin);
    let serialized =
        serde_json::to_string_pretty(&report).context("Failed to serialize load report to JSON")?;
    println!("{}", serialized);
    Ok(())
}

/// List every section the loader retained.
fn sections_command(bin: &Binary) {
    println!("Sections ({}):", bin.sections.len());
    if bin.sections.is_empty() {
        println!("  (none)");
        return;
    }

    for sec in &bin.sections {
        println!("{}", section_line(sec));
    }
}

/// List every function symbol the loader retained.
fn symbols_command(bin: &Binary) {
    println!("Symbols ({}):", bin.symbols.len());
    if bin.symbols.is_empty() {
        println!("  (none)");
        return;
    }

    for sym in &bin.symbols {
        println!("{}", symbol_line(sym));
    }
}

/// Disassemble the named section and print one line per instruction.
fn disasm_command(bin: &Binary, name: &str) -> Result<()> {
    let sec = bin
        .section_by_name(name)
        .ok_or_else(|| anyhow!("No section named {} in {}", name, bin.filename.display()))?;

    let insns = lens_core::disasm::disassemble(bin.arch, bin.bits, &sec.bytes, sec.vma)
        .with_context(|| format!("Failed to disassemble section {}", sec.name))?;

    println!("Disassembly of section {} ({} instructions):", sec.name, insns.remaining());
    for insn in insns {
        println!("{}", insn);
    }

    Ok(())
}
