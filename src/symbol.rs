use std::str::FromStr;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::cond::Cond;
use crate::instr::{Opcode, ShiftKind};

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label name to byte address, in definition order.
#[derive(Default, Debug)]
pub struct SymbolTable {
    map: FxMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Bind `label` to `addr`. Returns the earlier address if the label was already bound, in
    /// which case the table is left unchanged.
    pub fn insert(&mut self, label: &str, addr: u32) -> Option<u32> {
        if let Some(&prev) = self.map.get(label) {
            return Some(prev);
        }
        self.map.insert(label.to_owned(), addr);
        None
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.map.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.map.iter().map(|(label, &addr)| (label.as_str(), addr))
    }
}

/// Every mnemonic the assembler accepts, grouped by operand shape.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    /// `op rd, rn, <operand2>`
    Compute(Opcode),
    /// `mov rd, <operand2>`
    Mov,
    /// `op rn, <operand2>`, always sets flags
    Compare(Opcode),
    Mul,
    Mla,
    Ldr,
    Str,
    Branch(Cond),
    /// `lsl rd, #n` and friends, shorthand for `mov rd, rd, <kind> #n`
    Shift(ShiftKind),
    /// `andeq r0, r0, r0`, the halt word
    Andeq,
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mnemonic = match s.to_ascii_lowercase().as_str() {
            "and" => Mnemonic::Compute(Opcode::And),
            "eor" => Mnemonic::Compute(Opcode::Eor),
            "sub" => Mnemonic::Compute(Opcode::Sub),
            "rsb" => Mnemonic::Compute(Opcode::Rsb),
            "add" => Mnemonic::Compute(Opcode::Add),
            "orr" => Mnemonic::Compute(Opcode::Orr),
            "mov" => Mnemonic::Mov,
            "tst" => Mnemonic::Compare(Opcode::Tst),
            "teq" => Mnemonic::Compare(Opcode::Teq),
            "cmp" => Mnemonic::Compare(Opcode::Cmp),
            "mul" => Mnemonic::Mul,
            "mla" => Mnemonic::Mla,
            "ldr" => Mnemonic::Ldr,
            "str" => Mnemonic::Str,
            "beq" => Mnemonic::Branch(Cond::Eq),
            "bne" => Mnemonic::Branch(Cond::Ne),
            "bge" => Mnemonic::Branch(Cond::Ge),
            "blt" => Mnemonic::Branch(Cond::Lt),
            "bgt" => Mnemonic::Branch(Cond::Gt),
            "ble" => Mnemonic::Branch(Cond::Le),
            "bal" | "b" => Mnemonic::Branch(Cond::Al),
            "lsl" => Mnemonic::Shift(ShiftKind::Lsl),
            "lsr" => Mnemonic::Shift(ShiftKind::Lsr),
            "asr" => Mnemonic::Shift(ShiftKind::Asr),
            "ror" => Mnemonic::Shift(ShiftKind::Ror),
            "andeq" => Mnemonic::Andeq,
            _ => return Err(()),
        };
        Ok(mnemonic)
    }
}
