// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Second pass: resolve label references and emit the memory image.
//!
//! Runs only when the first pass finished clean, so the symbol table is
//! complete and reconciled. Syntax is not re-checked here; the line records
//! carry everything except label addresses.

use crate::error::{AsmError, Diagnostic, Severity};
use crate::image::{Era, MemoryImage, MemoryWord, WordBits};
use crate::parser::{Operand, SourceLine, Statement};
use crate::symbol_table::{Symbol, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Source,
    Dest,
}

/// Encoder over the line records of one file.
pub struct SecondPass<'a> {
    symbols: &'a SymbolTable,
    pub image: MemoryImage,
    /// `(label, resolved address)` per `.entry`, in declaration order.
    pub entries: Vec<(String, u16)>,
    /// `(label, referencing word address)` per external reference, in
    /// emission order.
    pub externs: Vec<(String, u16)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> SecondPass<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            image: MemoryImage::new(),
            entries: Vec::new(),
            externs: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Encode every line, then append the data segment.
    pub fn run(&mut self, lines: &[SourceLine], data: &[i16]) {
        for line in lines {
            match &line.statement {
                Statement::Instruction {
                    entry,
                    source,
                    dest,
                } => {
                    if let Err(err) = self.encode_instruction(line, entry.opcode, source, dest) {
                        self.error(line.number, err);
                    }
                }
                Statement::Entry { name } => {
                    if let Err(err) = self.resolve_entry(name) {
                        self.error(line.number, err);
                    }
                }
                _ => {}
            }
        }
        for &value in data {
            self.image.store(MemoryWord {
                era: Era::Absolute,
                bits: WordBits::Value(value),
            });
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    /// Emit the words of one instruction line. On an undefined label the
    /// whole line is withheld; its diagnostic suppresses artifact output.
    fn encode_instruction(
        &mut self,
        line: &SourceLine,
        opcode: u8,
        source: &Option<Operand>,
        dest: &Option<Operand>,
    ) -> Result<(), AsmError> {
        let mut words = vec![MemoryWord {
            era: Era::Absolute,
            bits: WordBits::Opcode {
                opcode,
                src_mode: source.as_ref().map_or(0, Operand::mode),
                dest_mode: dest.as_ref().map_or(0, Operand::mode),
            },
        }];

        match (source, dest) {
            (Some(Operand::Register(src)), Some(Operand::Register(dest))) => {
                words.push(MemoryWord {
                    era: Era::Absolute,
                    bits: WordBits::Registers {
                        src: *src,
                        dest: *dest,
                    },
                });
            }
            _ => {
                if let Some(operand) = source {
                    self.operand_words(line, operand, Role::Source, &mut words)?;
                }
                if let Some(operand) = dest {
                    self.operand_words(line, operand, Role::Dest, &mut words)?;
                }
            }
        }

        for word in words {
            self.image.store(word);
        }
        Ok(())
    }

    fn operand_words(
        &mut self,
        line: &SourceLine,
        operand: &Operand,
        role: Role,
        words: &mut Vec<MemoryWord>,
    ) -> Result<(), AsmError> {
        match operand {
            Operand::Immediate(value) => {
                words.push(MemoryWord {
                    era: Era::Absolute,
                    bits: WordBits::Value(*value),
                });
            }
            Operand::Register(reg) => {
                let (src, dest) = match role {
                    Role::Source => (*reg, 0),
                    Role::Dest => (0, *reg),
                };
                words.push(MemoryWord {
                    era: Era::Absolute,
                    bits: WordBits::Registers { src, dest },
                });
            }
            Operand::Direct(name) => {
                let address = line.address + words.len() as u16;
                words.push(self.label_word(name, address)?);
            }
            Operand::Indexed { label, index } => {
                let address = line.address + words.len() as u16;
                words.push(self.label_word(label, address)?);
                words.push(MemoryWord {
                    era: Era::Absolute,
                    bits: WordBits::Value(*index),
                });
            }
        }
        Ok(())
    }

    /// The word for a label reference, recording external references as a
    /// side effect.
    fn label_word(&mut self, name: &str, word_address: u16) -> Result<MemoryWord, AsmError> {
        match self.symbols.lookup(name) {
            Some(Symbol::Label {
                is_extern: true, ..
            }) => {
                self.externs.push((name.to_string(), word_address));
                Ok(MemoryWord {
                    era: Era::External,
                    bits: WordBits::Value(0),
                })
            }
            Some(Symbol::Label { address, .. }) => Ok(MemoryWord {
                era: Era::Relocatable,
                bits: WordBits::Value(*address as i16),
            }),
            _ => Err(AsmError::UndefinedLabel(name.to_string())),
        }
    }

    fn resolve_entry(&mut self, name: &str) -> Result<(), AsmError> {
        match self.symbols.lookup(name) {
            Some(Symbol::Label {
                is_extern: true, ..
            }) => Err(AsmError::EntryIsExtern(name.to_string())),
            Some(Symbol::Label { address, .. }) => {
                self.entries.push((name.to_string(), *address));
                Ok(())
            }
            _ => Err(AsmError::UndefinedLabel(name.to_string())),
        }
    }

    fn error(&mut self, number: u32, err: AsmError) {
        self.diagnostics
            .push(Diagnostic::new(number, Severity::Error, err));
    }
}
