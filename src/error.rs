use std::num::ParseIntError;

use miette::{miette, LabeledSpan, Report, Severity};

use crate::lexer::Token;
use crate::span::Span;

// Parser errors

pub fn parse_unknown_mnemonic(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::mnemonic",
        help = "supported instructions are data processing, mul/mla, ldr/str, branches, shifts and andeq",
        labels = vec![LabeledSpan::at(span, "unknown mnemonic")],
        "Encountered an unknown mnemonic",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_generic_unexpected(src: &str, expected: &str, found: Token) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_token",
        help = "check the operands for this instruction",
        labels = vec![LabeledSpan::at(found.span, "unexpected token")],
        "Expected {expected}, found {}",
        found.kind
    )
    .with_source_code(src.to_owned())
}

pub fn parse_bad_lit(span: Span, src: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::bad_lit",
        help = "numbers are decimal like #12 or hex like #0xC, optionally negative",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal: {e}",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_lit_range(span: Span, src: &str, max: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::lit_range",
        help = format!("this operand accepts values up to {max}"),
        labels = vec![LabeledSpan::at(span, "out of range")],
        "Literal does not fit its field",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_duplicate_label(span: Span, src: &str, first: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::duplicate_label",
        help = format!("this label is already bound to address 0x{first:08x}"),
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label",
    )
    .with_source_code(src.to_owned())
}

// Encoding errors

pub fn asm_undefined_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::undefined_label",
        help = "labels are defined with `name:` at the start of a line",
        labels = vec![LabeledSpan::at(span, "undefined label")],
        "Branch to an undefined label",
    )
    .with_source_code(src.to_owned())
}

pub fn asm_immediate(span: Span, src: &str, value: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::immediate",
        help = "immediates must be an 8-bit value rotated right by an even amount; use `ldr rd, =value` to load any constant",
        labels = vec![LabeledSpan::at(span, "not representable")],
        "Immediate 0x{value:08x} cannot be encoded",
    )
    .with_source_code(src.to_owned())
}

pub fn asm_offset_range(span: Span, src: &str, offset: i64) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::offset",
        help = "transfer offsets are limited to 12 bits, at most 4095 bytes either way",
        labels = vec![LabeledSpan::at(span, "offset out of range")],
        "Offset {offset} does not fit the transfer offset field",
    )
    .with_source_code(src.to_owned())
}

pub fn asm_literal_store(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::literal_store",
        help = "`=value` can only be used with ldr",
        labels = vec![LabeledSpan::at(span, "literal operand")],
        "Cannot store to a constant",
    )
    .with_source_code(src.to_owned())
}
