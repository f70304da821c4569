use miette::Result;

use crate::parser::AsmParser;

/// Output of the assembler: instruction words at their addresses followed by the literal pool.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    /// Zeroed image sized for the instruction stream.
    pub fn with_len(len: u32) -> Self {
        Image {
            bytes: vec![0; len as usize],
        }
    }

    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Store a word, little-endian, inside the existing image.
    pub fn write_word(&mut self, addr: u32, word: u32) {
        let start = addr as usize;
        self.bytes[start..start + 4].copy_from_slice(&word.to_le_bytes());
    }

    /// Grow the image by one word. Returns the address it landed at.
    pub fn push_word(&mut self, word: u32) -> u32 {
        let addr = self.len();
        self.bytes.extend_from_slice(&word.to_le_bytes());
        addr
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Assemble a whole source file into a flat little-endian binary.
pub fn assemble(src: &str) -> Result<Vec<u8>> {
    let air = AsmParser::new(src).parse()?;
    Ok(air.emit(src)?.into_bytes())
}
