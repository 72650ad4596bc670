// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asm14.

use std::process;

fn main() {
    let use_color = std::env::var("NO_COLOR").is_err();
    match asm14::assembler::run() {
        Ok(reports) => {
            let mut failed = false;
            for report in &reports {
                for diag in report.diagnostics() {
                    eprintln!(
                        "{}",
                        diag.format_with_context(
                            Some(report.file()),
                            Some(report.source_lines()),
                            use_color
                        )
                    );
                }
                let errors = report.error_count();
                if errors == 0 {
                    println!(
                        "{}: {} code + {} data words",
                        report.file(),
                        report.code_words(),
                        report.data_words()
                    );
                } else {
                    failed = true;
                    eprintln!(
                        "{}: {} error{} found - no output files written",
                        report.file(),
                        errors,
                        if errors == 1 { "" } else { "s" }
                    );
                }
            }
            if failed {
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
