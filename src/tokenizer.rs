// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared text utilities for line splitting and literal parsing.
//!
//! All helpers return substring views into the immutable line buffer; nothing
//! here mutates or reallocates the source text.

use crate::symbol_table::MAX_NAME_LENGTH;

/// A line is ignored when it is blank or its first non-space character is `;`.
pub fn is_comment_or_empty(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with(';')
}

/// Split a leading `name:` label off a line.
///
/// The colon must terminate the first whitespace-delimited word; otherwise the
/// line is returned unchanged with no label. The label text is not validated
/// here.
pub fn split_label(code: &str) -> (Option<&str>, &str) {
    let Some(idx) = code.find(':') else {
        return (None, code);
    };
    let head = code[..idx].trim();
    if head.is_empty() || head.contains(char::is_whitespace) {
        return (None, code);
    }
    (Some(head), &code[idx + 1..])
}

/// Split the first whitespace-delimited token off a line.
pub fn first_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

/// Read the next comma-separated operand.
///
/// Returns the operand text (empty between consecutive commas), the remaining
/// text after the separating comma, and whether a comma terminated the
/// operand. `None` when only whitespace remains.
pub fn next_operand(s: &str) -> (Option<&str>, &str, bool) {
    let s = s.trim_start();
    if s.is_empty() {
        return (None, "", false);
    }
    match s.find(',') {
        Some(idx) => (Some(s[..idx].trim_end()), &s[idx + 1..], true),
        None => (Some(s.trim_end()), "", false),
    }
}

/// Parse an optionally-signed decimal integer. No radix prefixes, no
/// whitespace, at least one digit.
pub fn parse_signed(text: &str) -> Option<i32> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i32>().ok()
}

/// Whether `value` fits a two's-complement field of `bits` bits.
pub fn fits_bits(value: i32, bits: u32) -> bool {
    let max = (1i32 << (bits - 1)) - 1;
    let min = -(1i32 << (bits - 1));
    value >= min && value <= max
}

/// Extract the interior of a double-quoted string parameter. The quotes must
/// be the first and last characters and the interior must be printable ASCII.
pub fn string_literal(s: &str) -> Option<&str> {
    let s = s.trim();
    let interior = s.strip_prefix('"')?.strip_suffix('"')?;
    if interior.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Some(interior)
    } else {
        None
    }
}

/// Label/constant name syntax: a letter followed by letters and digits, at
/// most `MAX_NAME_LENGTH` characters. Reserved-word collisions are checked
/// separately.
pub fn is_legal_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comments_and_blanks() {
        assert!(is_comment_or_empty(""));
        assert!(is_comment_or_empty("   \t"));
        assert!(is_comment_or_empty("; a comment"));
        assert!(is_comment_or_empty("   ; indented comment"));
        assert!(!is_comment_or_empty("mov r1, r2"));
    }

    #[test]
    fn splits_a_leading_label() {
        assert_eq!(split_label("MAIN: mov r1, r2"), (Some("MAIN"), " mov r1, r2"));
        assert_eq!(split_label("  L1:stop"), (Some("L1"), "stop"));
        assert_eq!(split_label("mov r1, r2"), (None, "mov r1, r2"));
    }

    #[test]
    fn colon_after_other_words_is_not_a_label() {
        let line = "mov r1, X: nope";
        assert_eq!(split_label(line), (None, line));
        let line = ".string \"a:b\"";
        assert_eq!(split_label(line), (None, line));
    }

    #[test]
    fn splits_first_token() {
        assert_eq!(first_token("  mov r1, r2"), ("mov", " r1, r2"));
        assert_eq!(first_token("stop"), ("stop", ""));
        assert_eq!(first_token("   "), ("", ""));
    }

    #[test]
    fn reads_operands_and_commas() {
        let (op, rest, comma) = next_operand(" #4 , r2");
        assert_eq!(op, Some("#4"));
        assert!(comma);
        let (op, rest2, comma) = next_operand(rest);
        assert_eq!(op, Some("r2"));
        assert!(!comma);
        assert_eq!(next_operand(rest2), (None, "", false));
    }

    #[test]
    fn empty_operand_between_commas() {
        let (op, rest, comma) = next_operand("1,,2");
        assert_eq!((op, comma), (Some("1"), true));
        let (op, _, comma) = next_operand(rest);
        assert_eq!((op, comma), (Some(""), true));
    }

    #[test]
    fn parses_signed_decimals() {
        assert_eq!(parse_signed("42"), Some(42));
        assert_eq!(parse_signed("-7"), Some(-7));
        assert_eq!(parse_signed("+13"), Some(13));
        assert_eq!(parse_signed(""), None);
        assert_eq!(parse_signed("-"), None);
        assert_eq!(parse_signed("0x1f"), None);
        assert_eq!(parse_signed("1 2"), None);
    }

    #[test]
    fn bit_ranges_are_twos_complement() {
        assert!(fits_bits(2047, 12));
        assert!(!fits_bits(2048, 12));
        assert!(fits_bits(-2048, 12));
        assert!(!fits_bits(-2049, 12));
        assert!(fits_bits(511, 10));
        assert!(!fits_bits(512, 10));
    }

    #[test]
    fn extracts_string_literals() {
        assert_eq!(string_literal("  \"hello\"  "), Some("hello"));
        assert_eq!(string_literal("\"\""), Some(""));
        assert_eq!(string_literal("hello"), None);
        assert_eq!(string_literal("\"unterminated"), None);
        assert_eq!(string_literal("\"tab\tinside\""), None);
    }

    #[test]
    fn validates_name_syntax() {
        assert!(is_legal_name("MAIN"));
        assert!(is_legal_name("a1b2"));
        assert!(is_legal_name(&"x".repeat(29)));
        assert!(!is_legal_name(&"x".repeat(30)));
        assert!(!is_legal_name(""));
        assert!(!is_legal_name("1abc"));
        assert!(!is_legal_name("with_underscore"));
        assert!(!is_legal_name("has space"));
    }
}
