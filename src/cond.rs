use std::fmt;

use crate::bits::{get_bit, set_bit_to};

/// Condition code carried in bits 31..28 of every instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond {
    /// Z set
    Eq,
    /// Z clear
    Ne,
    /// N == V
    Ge,
    /// N != V
    Lt,
    /// Z clear and N == V
    Gt,
    /// Z set or N != V
    Le,
    /// Unconditional
    Al,
    /// Any other 4-bit code. Never passes.
    Reserved(u8),
}

impl Cond {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Cond::Eq,
            0x1 => Cond::Ne,
            0xA => Cond::Ge,
            0xB => Cond::Lt,
            0xC => Cond::Gt,
            0xD => Cond::Le,
            0xE => Cond::Al,
            other => Cond::Reserved(other as u8),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Cond::Eq => 0x0,
            Cond::Ne => 0x1,
            Cond::Ge => 0xA,
            Cond::Lt => 0xB,
            Cond::Gt => 0xC,
            Cond::Le => 0xD,
            Cond::Al => 0xE,
            Cond::Reserved(bits) => bits as u32 & 0xF,
        }
    }

    /// Whether an instruction carrying this condition executes under `flags`.
    pub fn passes(self, flags: Flags) -> bool {
        let Flags { n, z, v, .. } = flags;
        match self {
            Cond::Eq => z,
            Cond::Ne => !z,
            Cond::Ge => n == v,
            Cond::Lt => n != v,
            Cond::Gt => !z && n == v,
            Cond::Le => z || n != v,
            Cond::Al => true,
            Cond::Reserved(_) => false,
        }
    }

    /// Mnemonic suffix, empty for `Al`.
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Ge => "ge",
            Cond::Lt => "lt",
            Cond::Gt => "gt",
            Cond::Le => "le",
            Cond::Al => "",
            Cond::Reserved(_) => "??",
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Status flags, stored in the top four bits of the CPSR.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Flags {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
}

impl Flags {
    pub const N_BIT: u32 = 31;
    pub const Z_BIT: u32 = 30;
    pub const C_BIT: u32 = 29;
    pub const V_BIT: u32 = 28;

    pub fn from_cpsr(cpsr: u32) -> Self {
        Flags {
            n: get_bit(cpsr, Self::N_BIT),
            z: get_bit(cpsr, Self::Z_BIT),
            c: get_bit(cpsr, Self::C_BIT),
            v: get_bit(cpsr, Self::V_BIT),
        }
    }

    /// Write the flags into `cpsr`, keeping its low 28 bits.
    pub fn apply(self, cpsr: u32) -> u32 {
        let cpsr = set_bit_to(cpsr, Self::N_BIT, self.n);
        let cpsr = set_bit_to(cpsr, Self::Z_BIT, self.z);
        let cpsr = set_bit_to(cpsr, Self::C_BIT, self.c);
        set_bit_to(cpsr, Self::V_BIT, self.v)
    }
}
