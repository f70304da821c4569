use std::ops::Range;

use miette::SourceSpan;

/// Byte range within the whole source file.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    offs: usize,
    len: usize,
}

impl Span {
    pub fn new(offs: usize, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn offs(&self) -> usize {
        self.offs
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn end(&self) -> usize {
        self.offs + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offs..self.end()
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}
