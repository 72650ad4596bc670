// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and reporting for the assembler.

use std::fmt;

use thiserror::Error;

/// Categories of assembler errors.
///
/// `Lexical` and `Semantic` errors are local to one source line; the line is
/// flagged and processing continues. `Capacity` and `Io` abort the current
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Lexical,
    Semantic,
    Capacity,
    Io,
}

/// An assembler error. One variant per diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    // Lexical
    #[error("Line is too long - max is 80 characters")]
    LineTooLong,
    #[error("`{0}` is not a legal name")]
    IllegalName(String),
    #[error("`{0}` is a reserved word")]
    ReservedName(String),
    #[error("`{0}` is not a valid number")]
    MalformedNumber(String),
    #[error("`{text}` does not fit in {bits} bits")]
    NumberOutOfRange { text: String, bits: u32 },
    #[error("Unbalanced brackets in `{0}`")]
    UnbalancedBrackets(String),
    #[error("`{0}` is not a legal string parameter")]
    MalformedString(String),
    #[error("There is a white space after the `#`")]
    SpaceAfterHash,
    #[error("Malformed `.define` - expected `name = value`")]
    DefineSyntax,

    // Semantic
    #[error("`{0}` is already defined")]
    DuplicateName(String),
    #[error("`{0}` is already declared as an entry")]
    DuplicateEntry(String),
    #[error("No such directive as `{0}`")]
    UnknownDirective(String),
    #[error("No such command as `{0}`")]
    UnknownMnemonic(String),
    #[error("Can't write a label on an empty line")]
    LabelOnlyLine,
    #[error("A label is not allowed before `.define`")]
    LabelBeforeDefine,
    #[error("The label before the directive is ignored")]
    LabelIgnored,
    #[error("Not enough operands for `{0}`")]
    MissingOperands(String),
    #[error("Too many operands for `{0}`")]
    TooManyOperands(String),
    #[error("Do not write a comma after the last operand")]
    TrailingComma,
    #[error("Expected a comma between operands")]
    MissingComma,
    #[error("Empty operand")]
    EmptyOperand,
    #[error("`{0}` is an invalid operand")]
    InvalidOperand(String),
    #[error("Missing parameter")]
    MissingParameter,
    #[error("Source operand for `{0}` must be a label")]
    SourceMustBeLabel(String),
    #[error("Destination operand for `{0}` can't be a number")]
    ImmediateDestination(String),
    #[error("Undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("`{0}` is declared `.extern` and can't be an entry")]
    EntryIsExtern(String),

    // Capacity
    #[error("File is too long - max is 700 lines")]
    TooManyLines,
    #[error("Too many labels and constants - max is 700")]
    TooManySymbols,
    #[error("Too much code and data - max is 4096 memory words")]
    MemoryFull,

    // Io
    #[error("{0}")]
    Io(String),
}

impl AsmError {
    pub fn kind(&self) -> AsmErrorKind {
        use AsmError::*;
        match self {
            LineTooLong | IllegalName(_) | ReservedName(_) | MalformedNumber(_)
            | NumberOutOfRange { .. } | UnbalancedBrackets(_) | MalformedString(_)
            | SpaceAfterHash | DefineSyntax => AsmErrorKind::Lexical,
            DuplicateName(_) | DuplicateEntry(_) | UnknownDirective(_) | UnknownMnemonic(_)
            | LabelOnlyLine | LabelBeforeDefine | LabelIgnored | MissingOperands(_)
            | TooManyOperands(_) | TrailingComma | MissingComma | EmptyOperand
            | InvalidOperand(_) | MissingParameter | SourceMustBeLabel(_)
            | ImmediateDestination(_) | UndefinedLabel(_) | EntryIsExtern(_) => {
                AsmErrorKind::Semantic
            }
            TooManyLines | TooManySymbols | MemoryFull => AsmErrorKind::Capacity,
            Io(_) => AsmErrorKind::Io,
        }
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic message tagged with a source line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    line: u32,
    severity: Severity,
    error: AsmError,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, error: AsmError) -> Self {
        Self {
            line,
            severity,
            error,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }

    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        format!("{}: {} - {}", self.line, sev, self.error)
    }

    /// Render the diagnostic with its source line, for terminal output.
    pub fn format_with_context(
        &self,
        file: Option<&str>,
        lines: Option<&[String]>,
        use_color: bool,
    ) -> String {
        let sev = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        let sev_colored = if use_color {
            let code = match self.severity {
                Severity::Warning => "33",
                Severity::Error => "31",
            };
            format!("\x1b[{code}m{sev}\x1b[0m")
        } else {
            sev.to_string()
        };

        let header = match file {
            Some(file) => format!("{file}:{}: {sev_colored}", self.line),
            None => format!("{}: {sev_colored}", self.line),
        };

        let mut out = String::new();
        out.push_str(&header);
        out.push('\n');

        let line_idx = self.line.saturating_sub(1) as usize;
        let line_text = lines
            .and_then(|lines| lines.get(line_idx))
            .map(|s| s.as_str())
            .unwrap_or("<source unavailable>");
        out.push_str(&format!("{:>5} | {}", self.line, line_text));
        out.push('\n');
        out.push_str(&format!("{sev_colored}: {}", self.error));
        out
    }
}

/// Report from assembling one source file.
#[derive(Debug)]
pub struct AsmRunReport {
    file: String,
    source_lines: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    code_words: u16,
    data_words: u16,
    artifacts_written: bool,
}

impl AsmRunReport {
    pub fn new(
        file: String,
        source_lines: Vec<String>,
        diagnostics: Vec<Diagnostic>,
        code_words: u16,
        data_words: u16,
        artifacts_written: bool,
    ) -> Self {
        Self {
            file,
            source_lines,
            diagnostics,
            code_words,
            data_words,
            artifacts_written,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn code_words(&self) -> u16 {
        self.code_words
    }

    pub fn data_words(&self) -> u16 {
        self.data_words
    }

    pub fn artifacts_written(&self) -> bool {
        self.artifacts_written
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Error that aborts the whole run before any file is assembled.
#[derive(Debug)]
pub struct AsmRunError {
    error: AsmError,
}

impl AsmRunError {
    pub fn new(error: AsmError) -> Self {
        Self { error }
    }
}

impl fmt::Display for AsmRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AsmRunError {}
