// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-file assembly pipeline and artifact emission.
//!
//! Each source file is translated by a fresh [`Translation`] context: first
//! pass, address reconciliation, second pass. Nothing is shared between
//! files, so a failing file never disturbs the rest of the batch.

pub mod cli;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{AsmError, AsmRunError, AsmRunReport, Diagnostic, Severity};
use crate::first_pass::FirstPass;
use crate::image::MemoryImage;
use crate::second_pass::SecondPass;
use crate::symbol_table::SymbolTable;

pub const MAX_LINE_LENGTH: usize = 80;
pub const MAX_SOURCE_LINES: usize = 700;

/// Everything produced by translating one file.
#[derive(Debug)]
pub struct Translation {
    pub ic: u16,
    pub dc: u16,
    pub symbols: SymbolTable,
    pub image: MemoryImage,
    pub entries: Vec<(String, u16)>,
    pub externs: Vec<(String, u16)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    /// Artifacts may be emitted only for a clean translation.
    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }
}

/// Translate one file's source lines. Touches no files; the caller owns all
/// I/O.
pub fn translate(source: &[String]) -> Translation {
    let mut first = FirstPass::new();
    let _ = first.run(source);
    let mut diagnostics = std::mem::take(&mut first.diagnostics);
    let first_clean = !diagnostics
        .iter()
        .any(|d| d.severity() == Severity::Error);

    let mut image = MemoryImage::new();
    let mut entries = Vec::new();
    let mut externs = Vec::new();

    if first_clean {
        first.symbols.relocate_data_labels(first.ic);
        let mut second = SecondPass::new(&first.symbols);
        second.run(&first.lines, &first.data);
        diagnostics.append(&mut second.diagnostics);
        image = second.image;
        entries = second.entries;
        externs = second.externs;
    }

    let clean = !diagnostics.iter().any(|d| d.severity() == Severity::Error);
    if clean {
        debug_assert_eq!(
            image.len(),
            first.ic as usize + first.dc as usize,
            "second pass must emit exactly IC + DC words"
        );
    }

    Translation {
        ic: first.ic,
        dc: first.dc,
        symbols: first.symbols,
        image,
        entries,
        externs,
        diagnostics,
    }
}

/// Assemble every input file and report per-file results.
pub fn run() -> Result<Vec<AsmRunReport>, AsmRunError> {
    let args = cli::Cli::parse();
    let config = cli::validate(&args)?;

    let mut reports = Vec::new();
    for path in &args.files {
        reports.push(run_one(path, config.out_dir.as_deref()));
    }
    Ok(reports)
}

/// Assemble one file. I/O failures abort this file only.
pub fn run_one(path: &Path, out_dir: Option<&Path>) -> AsmRunReport {
    let file_name = path.to_string_lossy().to_string();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            let diag = Diagnostic::new(
                0,
                Severity::Error,
                AsmError::Io(format!("Cannot open file: {err}")),
            );
            return AsmRunReport::new(file_name, Vec::new(), vec![diag], 0, 0, false);
        }
    };
    let source: Vec<String> = contents.lines().map(|s| s.to_string()).collect();

    let translation = translate(&source);
    let clean = translation.is_clean();
    let (ic, dc) = (translation.ic, translation.dc);
    let mut diagnostics = translation.diagnostics;

    let mut written = false;
    if clean {
        let base = output_base(path, out_dir);
        match write_artifacts(&base, ic, dc, &translation.image, &translation.entries, &translation.externs) {
            Ok(()) => written = true,
            Err(err) => diagnostics.push(Diagnostic::new(
                0,
                Severity::Error,
                AsmError::Io(format!("Cannot write output files: {err}")),
            )),
        }
    }

    AsmRunReport::new(file_name, source, diagnostics, ic, dc, written)
}

fn output_base(path: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => dir.join(path.file_name().unwrap_or_default()),
        None => path.to_path_buf(),
    }
}

fn write_artifacts(
    base: &Path,
    ic: u16,
    dc: u16,
    image: &MemoryImage,
    entries: &[(String, u16)],
    externs: &[(String, u16)],
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(base.with_extension("ob"))?);
    image.write_object_file(&mut out, ic, dc)?;
    out.flush()?;

    if !entries.is_empty() {
        let mut out = BufWriter::new(File::create(base.with_extension("ent"))?);
        write_name_address_pairs(&mut out, entries)?;
        out.flush()?;
    }
    if !externs.is_empty() {
        let mut out = BufWriter::new(File::create(base.with_extension("ext"))?);
        write_name_address_pairs(&mut out, externs)?;
        out.flush()?;
    }
    Ok(())
}

/// Shared layout of the entries and externs artifacts.
pub fn write_name_address_pairs<W: Write>(
    mut out: W,
    pairs: &[(String, u16)],
) -> io::Result<()> {
    for (idx, (name, address)) in pairs.iter().enumerate() {
        if idx > 0 {
            writeln!(out)?;
        }
        write!(out, "{name}\t\t{address}")?;
    }
    Ok(())
}
