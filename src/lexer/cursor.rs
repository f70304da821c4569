// Modelled on the cursor in `rustc_lexer`.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

pub(crate) const EOF_CHAR: char = '\0';

/// Peekable iterator over the characters of one source line.
#[derive(Clone)]
pub struct Cursor<'a> {
    len_remaining: usize,
    chars: Chars<'a>,
    /// Offset of the line within the whole source
    base: usize,
    /// Offset of the start of the current token within the line
    token_start: usize,
    line: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(line: &'a str, base: usize) -> Cursor<'a> {
        Cursor {
            len_remaining: line.len(),
            chars: line.chars(),
            base,
            token_start: 0,
            line,
        }
    }

    /// Next character without consuming it, or `EOF_CHAR` at the end of the line.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Bytes consumed since the last `reset_pos`.
    pub fn pos_in_token(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    /// Start a new token at the current position.
    pub fn reset_pos(&mut self) {
        self.token_start = self.line.len() - self.chars.as_str().len();
        self.len_remaining = self.chars.as_str().len();
    }

    /// Text consumed since the last `reset_pos`.
    pub fn token_text(&self) -> &'a str {
        &self.line[self.token_start..self.token_start + self.pos_in_token()]
    }

    /// Absolute offset of the current token.
    pub fn token_offs(&self) -> usize {
        self.base + self.token_start
    }
}
