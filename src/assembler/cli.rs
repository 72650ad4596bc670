// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use crate::error::{AsmError, AsmRunError};

#[derive(Parser, Debug)]
#[command(
    name = "asm14",
    version,
    about = "Two-pass assembler for the 14-bit instructional CPU",
    long_about = "Two-pass assembler for the 14-bit instructional CPU.\n\n\
        Each input file that assembles without errors produces an object file\n\
        (.ob) plus, when used, an entries file (.ent) and an externals file\n\
        (.ext) next to the source or under -o/--out-dir."
)]
pub struct Cli {
    /// Input source files, each ending in .as
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directory for output artifacts; defaults to each source's directory
    #[arg(short = 'o', long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub out_dir: Option<PathBuf>,
}

pub fn validate(cli: &Cli) -> Result<CliConfig, AsmRunError> {
    for path in &cli.files {
        if path.extension().and_then(|e| e.to_str()) != Some("as") {
            return Err(AsmRunError::new(AsmError::Io(format!(
                "Input file must end with .as: {}",
                path.display()
            ))));
        }
    }

    if let Some(dir) = &cli.out_dir {
        if let Err(err) = fs::create_dir_all(dir) {
            return Err(AsmRunError::new(AsmError::Io(format!(
                "Cannot create output directory {}: {err}",
                dir.display()
            ))));
        }
    }

    Ok(CliConfig {
        out_dir: cli.out_dir.clone(),
    })
}
