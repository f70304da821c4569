use std::fmt;
use std::num::ParseIntError;

use crate::lexer::cursor::Cursor;
use crate::span::Span;

pub mod cursor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonics, shift names and labels
    Ident,
    /// `r0` to `r15`
    Reg(u8),
    /// `#5`, `#-4`, `#0x1f`
    Imm,
    /// `=0x12345678`, the operand of the load-constant pseudo-instruction
    Lit,
    Comma,
    OpenBracket,
    CloseBracket,
    Colon,
    Minus,
    Unknown,
    /// End of the line
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident => f.write_str("identifier"),
            TokenKind::Reg(_) => f.write_str("register"),
            TokenKind::Imm => f.write_str("immediate"),
            TokenKind::Lit => f.write_str("literal"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::OpenBracket => f.write_str("'['"),
            TokenKind::CloseBracket => f.write_str("']'"),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Unknown => f.write_str("unknown token"),
            TokenKind::Eof => f.write_str("end of line"),
        }
    }
}

/// Split one line into tokens, always ending with `Eof`. `base` is the offset of the line in the
/// whole source, so spans can be reported against it.
pub fn tokenize(line: &str, base: usize) -> Vec<Token> {
    let mut cursor = Cursor::new(line, base);
    let mut toks = Vec::new();
    loop {
        let token = cursor.advance_token();
        toks.push(token);
        if token.kind == TokenKind::Eof {
            return toks;
        }
    }
}

pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

/// Register number for `r<digits>`, if in range.
fn register(ident: &str) -> Option<u8> {
    let digits = ident.strip_prefix(['r', 'R'])?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&reg| reg <= 15)
}

/// Value of a number after its `#` or `=` prefix: decimal, or hex with `0x`, optionally negated.
pub fn parse_int(text: &str) -> Result<i64, ParseIntError> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16)?,
        None => digits.parse::<i64>()?,
    };
    Ok(if negative { -magnitude } else { magnitude })
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> Token {
        self.take_while(is_whitespace);
        self.reset_pos();

        let first_char = match self.bump() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, Span::new(self.token_offs(), 0)),
        };
        let kind = match first_char {
            ',' => TokenKind::Comma,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            ':' => TokenKind::Colon,
            '-' => TokenKind::Minus,
            '#' | '=' => {
                if self.first() == '-' {
                    self.bump();
                }
                self.take_while(is_id);
                if first_char == '#' {
                    TokenKind::Imm
                } else {
                    TokenKind::Lit
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                self.take_while(is_id);
                // Registers are identifiers of a particular shape
                match register(self.token_text()) {
                    Some(reg) => TokenKind::Reg(reg),
                    None => TokenKind::Ident,
                }
            }
            _ => {
                self.take_while(|c| !is_whitespace(c) && !matches!(c, ',' | '[' | ']'));
                TokenKind::Unknown
            }
        };
        Token::new(kind, Span::new(self.token_offs(), self.pos_in_token()))
    }
}
