// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! First pass: classify every line, build the symbol table, and advance the
//! instruction and data counters.
//!
//! Lexical and semantic errors flag the offending line and scanning continues
//! so one run surfaces as many diagnostics as possible. Capacity overflow
//! aborts the pass.

use crate::assembler::{MAX_LINE_LENGTH, MAX_SOURCE_LINES};
use crate::error::{AsmError, AsmErrorKind, Diagnostic, Severity};
use crate::image::{BASE_ADDRESS, MEMORY_SIZE};
use crate::instructions::{instruction, Directive, InstructionEntry};
use crate::parser::{
    parse_define, resolve_data_value, resolve_operand, validate_new_name, Operand, SourceLine,
    Statement,
};
use crate::symbol_table::{DefineResult, SymbolTable};
use crate::tokenizer::{
    first_token, is_comment_or_empty, next_operand, split_label, string_literal,
};

/// All state produced by the first pass over one file.
#[derive(Debug, Default)]
pub struct FirstPass {
    pub symbols: SymbolTable,
    pub lines: Vec<SourceLine>,
    /// Data-segment words in emission order, already validated.
    pub data: Vec<i16>,
    pub diagnostics: Vec<Diagnostic>,
    pub ic: u16,
    pub dc: u16,
    entry_names: Vec<String>,
}

impl FirstPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process every source line. `Err` means a capacity overflow aborted the
    /// pass; the diagnostic is already recorded.
    pub fn run(&mut self, source: &[String]) -> Result<(), AsmError> {
        for (idx, raw) in source.iter().enumerate() {
            let number = idx as u32 + 1;
            if idx >= MAX_SOURCE_LINES {
                return Err(self.fatal(number, AsmError::TooManyLines));
            }
            if raw.len() > MAX_LINE_LENGTH {
                self.error(number, AsmError::LineTooLong);
                self.push_line(number, BASE_ADDRESS + self.ic, None, Statement::Invalid);
                continue;
            }
            self.process_line(raw, number)?;
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    fn process_line(&mut self, raw: &str, number: u32) -> Result<(), AsmError> {
        // The line's first word sits at the IC before any words are reserved.
        let address = BASE_ADDRESS + self.ic;
        if is_comment_or_empty(raw) {
            self.push_line(number, address, None, Statement::Empty);
            return Ok(());
        }

        // Macro definitions are recognized before label extraction, so a
        // stray label prefix is reported instead of registered.
        let (first, after_first) = first_token(raw);
        if first == ".define" {
            let result = self.handle_define(after_first);
            let statement = self.settle(number, result)?;
            self.push_line(number, address, None, statement);
            return Ok(());
        }

        let (label_tok, after_label) = split_label(raw);
        let mut label = None;
        if let Some(name) = label_tok {
            let (tok, _) = first_token(after_label);
            if tok == ".define" {
                self.error(number, AsmError::LabelBeforeDefine);
                self.push_line(number, address, None, Statement::Invalid);
                return Ok(());
            }
            match self.register_label(name) {
                Ok(()) => label = Some(name.to_string()),
                Err(err) => {
                    let statement = self.settle(number, Err(err))?;
                    self.push_line(number, address, None, statement);
                    return Ok(());
                }
            }
        }

        let (command, operand_text) = first_token(after_label);
        let result = if command.is_empty() {
            Err(AsmError::LabelOnlyLine)
        } else if let Some(name) = command.strip_prefix('.') {
            match Directive::from_name(name) {
                Some(Directive::Data) => self.handle_data(label.as_deref(), operand_text),
                Some(Directive::Str) => self.handle_string(label.as_deref(), operand_text),
                Some(Directive::Extern) => self.handle_extern(&mut label, number, operand_text),
                Some(Directive::Entry) => self.handle_entry(&mut label, number, operand_text),
                None => Err(AsmError::UnknownDirective(command.to_string())),
            }
        } else {
            self.handle_instruction(command, operand_text)
        };

        let statement = self.settle(number, result)?;
        self.push_line(number, address, label, statement);
        Ok(())
    }

    /// Line-local errors become a diagnostic and an `Invalid` statement;
    /// capacity errors propagate and abort the pass.
    fn settle(
        &mut self,
        number: u32,
        result: Result<Statement, AsmError>,
    ) -> Result<Statement, AsmError> {
        match result {
            Ok(statement) => Ok(statement),
            Err(err) if err.kind() == AsmErrorKind::Capacity => Err(self.fatal(number, err)),
            Err(err) => {
                self.error(number, err);
                Ok(Statement::Invalid)
            }
        }
    }

    fn push_line(
        &mut self,
        number: u32,
        address: u16,
        label: Option<String>,
        statement: Statement,
    ) {
        self.lines.push(SourceLine {
            number,
            address,
            label,
            statement,
        });
    }

    fn register_label(&mut self, name: &str) -> Result<(), AsmError> {
        validate_new_name(name)?;
        match self
            .symbols
            .define_label(name, BASE_ADDRESS + self.ic, false)
        {
            DefineResult::Ok => Ok(()),
            DefineResult::Duplicate => Err(AsmError::DuplicateName(name.to_string())),
            DefineResult::TableFull => Err(AsmError::TooManySymbols),
        }
    }

    fn handle_define(&mut self, text: &str) -> Result<Statement, AsmError> {
        let (name, value) = parse_define(text)?;
        match self.symbols.define_constant(name, value) {
            DefineResult::Ok => Ok(Statement::Define),
            DefineResult::Duplicate => Err(AsmError::DuplicateName(name.to_string())),
            DefineResult::TableFull => Err(AsmError::TooManySymbols),
        }
    }

    fn handle_data(&mut self, label: Option<&str>, text: &str) -> Result<Statement, AsmError> {
        if let Some(name) = label {
            self.symbols.mark_data(name, BASE_ADDRESS + self.dc);
        }
        if text.trim().is_empty() {
            return Err(AsmError::MissingParameter);
        }

        let mut rest = text;
        let mut last_comma = false;
        loop {
            let (token, next, comma) = next_operand(rest);
            let Some(token) = token else { break };
            let value = resolve_data_value(token, &self.symbols)?;
            self.push_data(value)?;
            last_comma = comma;
            rest = next;
        }
        if last_comma {
            return Err(AsmError::TrailingComma);
        }
        Ok(Statement::Data)
    }

    fn handle_string(&mut self, label: Option<&str>, text: &str) -> Result<Statement, AsmError> {
        if let Some(name) = label {
            self.symbols.mark_data(name, BASE_ADDRESS + self.dc);
        }
        let Some(interior) = string_literal(text) else {
            return Err(AsmError::MalformedString(text.trim().to_string()));
        };
        for byte in interior.bytes() {
            self.push_data(byte as i16)?;
        }
        self.push_data(0)?;
        Ok(Statement::Str)
    }

    fn handle_extern(
        &mut self,
        label: &mut Option<String>,
        number: u32,
        text: &str,
    ) -> Result<Statement, AsmError> {
        self.drop_directive_label(label, number);
        let name = text.trim();
        if name.is_empty() {
            return Err(AsmError::MissingParameter);
        }
        validate_new_name(name)?;
        match self.symbols.define_label(name, 0, true) {
            DefineResult::Ok => Ok(Statement::Extern),
            DefineResult::Duplicate => Err(AsmError::DuplicateName(name.to_string())),
            DefineResult::TableFull => Err(AsmError::TooManySymbols),
        }
    }

    fn handle_entry(
        &mut self,
        label: &mut Option<String>,
        number: u32,
        text: &str,
    ) -> Result<Statement, AsmError> {
        self.drop_directive_label(label, number);
        let name = text.trim();
        if name.is_empty() {
            return Err(AsmError::MissingParameter);
        }
        validate_new_name(name)?;
        if self.entry_names.iter().any(|n| n == name) {
            return Err(AsmError::DuplicateEntry(name.to_string()));
        }
        self.entry_names.push(name.to_string());
        Ok(Statement::Entry {
            name: name.to_string(),
        })
    }

    /// Labels carried on `.extern`/`.entry` lines are meaningless; discard
    /// the registration and warn.
    fn drop_directive_label(&mut self, label: &mut Option<String>, number: u32) {
        if let Some(name) = label.take() {
            self.symbols.discard(&name);
            self.diagnostics.push(Diagnostic::new(
                number,
                Severity::Warning,
                AsmError::LabelIgnored,
            ));
        }
    }

    fn handle_instruction(&mut self, command: &str, text: &str) -> Result<Statement, AsmError> {
        let entry = instruction(command)
            .ok_or_else(|| AsmError::UnknownMnemonic(command.to_string()))?;

        let mut operands: Vec<Operand> = Vec::new();
        let mut rest = text;
        let mut last_comma = false;
        loop {
            let (token, next, comma) = next_operand(rest);
            let Some(token) = token else { break };
            if operands.len() == 2 {
                return Err(AsmError::TooManyOperands(command.to_string()));
            }
            if token.contains(char::is_whitespace) {
                return Err(AsmError::MissingComma);
            }
            operands.push(resolve_operand(token, &self.symbols)?);
            last_comma = comma;
            rest = next;
        }
        if last_comma {
            return Err(AsmError::TrailingComma);
        }

        if operands.len() != entry.operands as usize {
            return Err(if operands.len() < entry.operands as usize {
                AsmError::MissingOperands(command.to_string())
            } else {
                AsmError::TooManyOperands(command.to_string())
            });
        }

        let mut operands = operands.into_iter();
        let (source, dest) = match entry.operands {
            2 => (operands.next(), operands.next()),
            1 => (None, operands.next()),
            _ => (None, None),
        };

        check_addressing(entry, source.as_ref(), dest.as_ref())?;

        let words = instruction_words(source.as_ref(), dest.as_ref());
        self.reserve_code(words)?;

        Ok(Statement::Instruction {
            entry,
            source,
            dest,
        })
    }

    fn reserve_code(&mut self, words: u16) -> Result<(), AsmError> {
        if self.ic as usize + self.dc as usize + words as usize > MEMORY_SIZE {
            return Err(AsmError::MemoryFull);
        }
        self.ic += words;
        Ok(())
    }

    fn push_data(&mut self, value: i16) -> Result<(), AsmError> {
        if self.ic as usize + self.dc as usize + 1 > MEMORY_SIZE {
            return Err(AsmError::MemoryFull);
        }
        self.data.push(value);
        self.dc += 1;
        Ok(())
    }

    fn error(&mut self, number: u32, err: AsmError) {
        self.diagnostics
            .push(Diagnostic::new(number, Severity::Error, err));
    }

    fn fatal(&mut self, number: u32, err: AsmError) -> AsmError {
        self.error(number, err.clone());
        err
    }
}

/// Per-mnemonic addressing legality, validated after arity.
fn check_addressing(
    entry: &InstructionEntry,
    source: Option<&Operand>,
    dest: Option<&Operand>,
) -> Result<(), AsmError> {
    if entry.requires_label_source() && !matches!(source, Some(Operand::Direct(_))) {
        return Err(AsmError::SourceMustBeLabel(entry.mnemonic.to_string()));
    }
    if matches!(dest, Some(Operand::Immediate(_))) && !entry.allows_immediate_destination() {
        return Err(AsmError::ImmediateDestination(entry.mnemonic.to_string()));
    }
    Ok(())
}

/// Words reserved for one instruction: the opcode word, a single shared word
/// when both operands are registers, otherwise one word per operand plus one
/// extra per indexed operand.
fn instruction_words(source: Option<&Operand>, dest: Option<&Operand>) -> u16 {
    if let (Some(source), Some(dest)) = (source, dest) {
        if source.is_register() && dest.is_register() {
            return 2;
        }
    }
    1 + source.map_or(0, Operand::words) + dest.map_or(0, Operand::words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::Symbol;

    fn run_pass(lines: &[&str]) -> FirstPass {
        let source: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let mut pass = FirstPass::new();
        let _ = pass.run(&source);
        pass
    }

    fn label_address(pass: &FirstPass, name: &str) -> u16 {
        match pass.symbols.lookup(name) {
            Some(Symbol::Label { address, .. }) => *address,
            other => panic!("expected label {name}, got {other:?}"),
        }
    }

    #[test]
    fn counts_words_per_instruction_form() {
        let pass = run_pass(&[
            "stop",            // 1 word
            "not r1",          // 2 words: opcode + register
            "mov r1, r2",      // 2 words: opcode + shared register word
            "mov #4, r2",      // 3 words: opcode + immediate + register
            "mov X, Y",        // 3 words: opcode + two address words
            "mov X[2], r2",    // 4 words: opcode + base + index + register
        ]);
        assert_eq!(pass.error_count(), 0);
        assert_eq!(pass.ic, 1 + 2 + 2 + 3 + 3 + 4);
        assert_eq!(pass.dc, 0);
    }

    #[test]
    fn code_labels_take_the_running_ic_address() {
        let pass = run_pass(&["MAIN: mov r1, r2", "NEXT: stop"]);
        assert_eq!(pass.error_count(), 0);
        assert_eq!(label_address(&pass, "MAIN"), 100);
        assert_eq!(label_address(&pass, "NEXT"), 102);
    }

    #[test]
    fn data_and_string_fill_the_data_image() {
        let pass = run_pass(&[
            ".define LEN = 4",
            "VALS: .data 7, -2, LEN",
            "MSG: .string \"ab\"",
        ]);
        assert_eq!(pass.error_count(), 0);
        assert_eq!(pass.data, vec![7, -2, 4, b'a' as i16, b'b' as i16, 0]);
        assert_eq!(pass.dc, 6);
        assert_eq!(pass.ic, 0);
        // data labels hold base + DC until reconciliation
        assert_eq!(label_address(&pass, "VALS"), 100);
        assert_eq!(label_address(&pass, "MSG"), 103);
    }

    #[test]
    fn define_registers_a_constant() {
        let pass = run_pass(&[".define N = 4", "mov #N, r2"]);
        assert_eq!(pass.error_count(), 0);
        assert_eq!(pass.symbols.constant_value("N"), Some(4));
    }

    #[test]
    fn label_before_define_is_rejected() {
        let pass = run_pass(&["L: .define N = 4"]);
        assert_eq!(pass.error_count(), 1);
        assert!(!pass.symbols.is_defined("L"));
        assert!(!pass.symbols.is_defined("N"));
    }

    #[test]
    fn duplicate_names_are_rejected_in_every_combination() {
        let pass = run_pass(&[
            "X: stop",
            "X: stop",
            ".define X = 1",
            ".define Y = 2",
            "Y: stop",
            ".define Y = 3",
        ]);
        assert_eq!(pass.error_count(), 4);
    }

    #[test]
    fn reserved_words_cannot_be_labels() {
        let pass = run_pass(&["mov: .data 1"]);
        assert_eq!(pass.error_count(), 1);
        let diag = &pass.diagnostics[0];
        assert_eq!(diag.error(), &AsmError::ReservedName("mov".to_string()));
    }

    #[test]
    fn extern_label_prefix_is_discarded_with_a_warning() {
        let pass = run_pass(&["L: .extern EXT"]);
        assert_eq!(pass.error_count(), 0);
        assert_eq!(pass.diagnostics.len(), 1);
        assert_eq!(pass.diagnostics[0].severity(), Severity::Warning);
        assert!(!pass.symbols.is_defined("L"));
        assert_eq!(
            pass.symbols.lookup("EXT"),
            Some(&Symbol::Label {
                address: 0,
                is_extern: true,
                is_data: false
            })
        );
    }

    #[test]
    fn duplicate_entry_declarations_are_rejected() {
        let pass = run_pass(&["MAIN: stop", ".entry MAIN", ".entry MAIN"]);
        assert_eq!(pass.error_count(), 1);
        assert_eq!(
            pass.diagnostics[0].error(),
            &AsmError::DuplicateEntry("MAIN".to_string())
        );
    }

    #[test]
    fn operand_count_must_match_arity() {
        let pass = run_pass(&["mov r1", "stop r1", "inc r1, r2"]);
        assert_eq!(pass.error_count(), 3);
    }

    #[test]
    fn comma_discipline() {
        let pass = run_pass(&["mov r1, r2,", "mov r1 r2", ".data 1,,2"]);
        assert_eq!(pass.error_count(), 3);
        assert_eq!(
            pass.diagnostics[0].error(),
            &AsmError::TrailingComma
        );
        assert_eq!(pass.diagnostics[1].error(), &AsmError::MissingComma);
        assert_eq!(pass.diagnostics[2].error(), &AsmError::EmptyOperand);
    }

    #[test]
    fn lea_requires_a_direct_label_source() {
        let pass = run_pass(&["lea X, r1", "lea #3, r1", "lea r2, r1", "lea X[1], r1"]);
        assert_eq!(pass.error_count(), 3);
    }

    #[test]
    fn immediate_destinations_only_for_cmp_and_prn() {
        let pass = run_pass(&["cmp r1, #3", "prn #3", "mov r1, #3", "jmp #3"]);
        assert_eq!(pass.error_count(), 2);
    }

    #[test]
    fn unknown_mnemonic_vs_label_only_line() {
        let pass = run_pass(&["L:", "frobnicate r1"]);
        assert_eq!(pass.error_count(), 2);
        assert_eq!(pass.diagnostics[0].error(), &AsmError::LabelOnlyLine);
        assert_eq!(
            pass.diagnostics[1].error(),
            &AsmError::UnknownMnemonic("frobnicate".to_string())
        );
    }

    #[test]
    fn long_lines_are_flagged_and_skipped() {
        let long = format!("mov r1, r2 ; {}", "x".repeat(80));
        let pass = run_pass(&[&long, "stop"]);
        assert_eq!(pass.error_count(), 1);
        assert_eq!(pass.diagnostics[0].error(), &AsmError::LineTooLong);
        assert_eq!(pass.ic, 1);
    }

    #[test]
    fn memory_overflow_aborts_the_pass() {
        // 37 values per line keeps each line within 80 characters; 111 lines
        // of 37 words overflow the 4096-word memory.
        let line = format!(".data {}", vec!["1"; 37].join(","));
        let lines: Vec<&str> = std::iter::repeat(line.as_str()).take(111).collect();
        let source: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let mut pass = FirstPass::new();
        let result = pass.run(&source);
        assert_eq!(result, Err(AsmError::MemoryFull));
        assert_eq!(pass.error_count(), 1);
    }

    #[test]
    fn line_cap_aborts_the_pass() {
        let source: Vec<String> = std::iter::repeat("stop".to_string()).take(701).collect();
        let mut pass = FirstPass::new();
        assert_eq!(pass.run(&source), Err(AsmError::TooManyLines));
    }

    #[test]
    fn forward_references_survive_the_first_pass() {
        let pass = run_pass(&["jmp AHEAD", "AHEAD: stop"]);
        assert_eq!(pass.error_count(), 0);
    }
}
