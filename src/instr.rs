use std::fmt;
use std::str::FromStr;

use crate::bits::{get_bit, get_bits, set_bit, set_bit_to, set_bits_to, sign_extend};
use crate::cond::Cond;

/// Data processing operation selected by bits 24..21.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Tst,
    Teq,
    Cmp,
    Orr,
    Mov,
    /// Encodable but not implemented by the emulator.
    Unassigned(u8),
}

impl Opcode {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Opcode::And,
            0x1 => Opcode::Eor,
            0x2 => Opcode::Sub,
            0x3 => Opcode::Rsb,
            0x4 => Opcode::Add,
            0x8 => Opcode::Tst,
            0x9 => Opcode::Teq,
            0xA => Opcode::Cmp,
            0xC => Opcode::Orr,
            0xD => Opcode::Mov,
            other => Opcode::Unassigned(other as u8),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Opcode::And => 0x0,
            Opcode::Eor => 0x1,
            Opcode::Sub => 0x2,
            Opcode::Rsb => 0x3,
            Opcode::Add => 0x4,
            Opcode::Tst => 0x8,
            Opcode::Teq => 0x9,
            Opcode::Cmp => 0xA,
            Opcode::Orr => 0xC,
            Opcode::Mov => 0xD,
            Opcode::Unassigned(bits) => bits as u32 & 0xF,
        }
    }

    /// `tst`, `teq` and `cmp` only update flags.
    pub fn writes_result(self) -> bool {
        !matches!(self, Opcode::Tst | Opcode::Teq | Opcode::Cmp)
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::And => "and",
            Opcode::Eor => "eor",
            Opcode::Sub => "sub",
            Opcode::Rsb => "rsb",
            Opcode::Add => "add",
            Opcode::Tst => "tst",
            Opcode::Teq => "teq",
            Opcode::Cmp => "cmp",
            Opcode::Orr => "orr",
            Opcode::Mov => "mov",
            Opcode::Unassigned(_) => "???",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShiftKind {
    Lsl = 0b00,
    Lsr = 0b01,
    Asr = 0b10,
    Ror = 0b11,
}

impl ShiftKind {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => ShiftKind::Lsl,
            0b01 => ShiftKind::Lsr,
            0b10 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShiftKind::Lsl => "lsl",
            ShiftKind::Lsr => "lsr",
            ShiftKind::Asr => "asr",
            ShiftKind::Ror => "ror",
        }
    }

    /// Shift `value` by `amount` (1 to 31). Also returns the last bit shifted out.
    pub fn apply(self, value: u32, amount: u32) -> (u32, bool) {
        debug_assert!((1..32).contains(&amount));
        match self {
            ShiftKind::Lsl => (value << amount, get_bit(value, 32 - amount)),
            ShiftKind::Lsr => (value >> amount, get_bit(value, amount - 1)),
            ShiftKind::Asr => (
                ((value as i32) >> amount) as u32,
                get_bit(value, amount - 1),
            ),
            ShiftKind::Ror => (value.rotate_right(amount), get_bit(value, amount - 1)),
        }
    }
}

impl FromStr for ShiftKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lsl" => Ok(ShiftKind::Lsl),
            "lsr" => Ok(ShiftKind::Lsr),
            "asr" => Ok(ShiftKind::Asr),
            "ror" => Ok(ShiftKind::Ror),
            _ => Err(()),
        }
    }
}

/// Register operand shifted by a constant, packed into a 12-bit operand field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ShiftedReg {
    pub rm: u8,
    pub kind: ShiftKind,
    /// Zero means the register value is used unshifted.
    pub amount: u8,
}

impl ShiftedReg {
    pub fn decode(field: u32) -> Self {
        ShiftedReg {
            rm: get_bits(field, 0, 3) as u8,
            kind: ShiftKind::from_bits(get_bits(field, 5, 6)),
            amount: get_bits(field, 7, 11) as u8,
        }
    }

    pub fn encode(self) -> u32 {
        let field = set_bits_to(0, 0, 3, self.rm as u32);
        let field = set_bits_to(field, 5, 6, self.kind as u32);
        set_bits_to(field, 7, 11, self.amount as u32)
    }
}

impl fmt::Display for ShiftedReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.rm)?;
        if self.amount != 0 {
            write!(f, ", {} #{}", self.kind.name(), self.amount)?;
        }
        Ok(())
    }
}

/// Expand an immediate operand2: an 8-bit value rotated right by twice the 4-bit rotate field.
pub fn decode_immediate(operand2: u32) -> u32 {
    let value = get_bits(operand2, 0, 7);
    let rotate = get_bits(operand2, 8, 11);
    value.rotate_right(2 * rotate)
}

/// Find the smallest even rotation that brings `value` into 8 bits and pack it as operand2.
/// Returns `None` when the value has no such representation.
pub fn encode_immediate(value: u32) -> Option<u32> {
    (0..16).find_map(|rotate| {
        let imm = value.rotate_left(2 * rotate);
        (imm <= 0xFF).then(|| set_bits_to(imm, 8, 11, rotate))
    })
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataProcessing {
    pub cond: Cond,
    /// Operand2 is a rotated immediate rather than a shifted register.
    pub immediate: bool,
    pub opcode: Opcode,
    pub set_flags: bool,
    pub rn: u8,
    pub rd: u8,
    pub operand2: u32,
}

impl DataProcessing {
    pub fn decode(word: u32) -> Self {
        DataProcessing {
            cond: Cond::from_bits(get_bits(word, 28, 31)),
            immediate: get_bit(word, 25),
            opcode: Opcode::from_bits(get_bits(word, 21, 24)),
            set_flags: get_bit(word, 20),
            rn: get_bits(word, 16, 19) as u8,
            rd: get_bits(word, 12, 15) as u8,
            operand2: get_bits(word, 0, 11),
        }
    }

    pub fn encode(&self) -> u32 {
        let word = set_bits_to(0, 28, 31, self.cond.bits());
        let word = set_bit_to(word, 25, self.immediate);
        let word = set_bits_to(word, 21, 24, self.opcode.bits());
        let word = set_bit_to(word, 20, self.set_flags);
        let word = set_bits_to(word, 16, 19, self.rn as u32);
        let word = set_bits_to(word, 12, 15, self.rd as u32);
        set_bits_to(word, 0, 11, self.operand2)
    }

    fn fmt_operand2(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.immediate {
            fmt_imm(f, decode_immediate(self.operand2))
        } else {
            write!(f, "{}", ShiftedReg::decode(self.operand2))
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Multiply {
    pub cond: Cond,
    pub accumulate: bool,
    pub set_flags: bool,
    pub rd: u8,
    pub rn: u8,
    pub rs: u8,
    pub rm: u8,
}

impl Multiply {
    pub fn decode(word: u32) -> Self {
        Multiply {
            cond: Cond::from_bits(get_bits(word, 28, 31)),
            accumulate: get_bit(word, 21),
            set_flags: get_bit(word, 20),
            rd: get_bits(word, 16, 19) as u8,
            rn: get_bits(word, 12, 15) as u8,
            rs: get_bits(word, 8, 11) as u8,
            rm: get_bits(word, 0, 3) as u8,
        }
    }

    pub fn encode(&self) -> u32 {
        let word = set_bits_to(0, 28, 31, self.cond.bits());
        let word = set_bit_to(word, 21, self.accumulate);
        let word = set_bit_to(word, 20, self.set_flags);
        let word = set_bits_to(word, 16, 19, self.rd as u32);
        let word = set_bits_to(word, 12, 15, self.rn as u32);
        let word = set_bits_to(word, 8, 11, self.rs as u32);
        let word = set_bit(set_bit(word, 7), 4);
        set_bits_to(word, 0, 3, self.rm as u32)
    }
}

/// Single data transfer (`ldr`/`str`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transfer {
    pub cond: Cond,
    /// Bit 25. Unlike data processing, a set bit means the offset is a shifted register.
    pub immediate: bool,
    pub pre_indexed: bool,
    /// Add the offset to the base rather than subtract it.
    pub up: bool,
    pub load: bool,
    pub rn: u8,
    pub rd: u8,
    pub offset: u32,
}

impl Transfer {
    pub fn decode(word: u32) -> Self {
        Transfer {
            cond: Cond::from_bits(get_bits(word, 28, 31)),
            immediate: get_bit(word, 25),
            pre_indexed: get_bit(word, 24),
            up: get_bit(word, 23),
            load: get_bit(word, 20),
            rn: get_bits(word, 16, 19) as u8,
            rd: get_bits(word, 12, 15) as u8,
            offset: get_bits(word, 0, 11),
        }
    }

    pub fn encode(&self) -> u32 {
        let word = set_bits_to(0, 28, 31, self.cond.bits());
        let word = set_bit(word, 26);
        let word = set_bit_to(word, 25, self.immediate);
        let word = set_bit_to(word, 24, self.pre_indexed);
        let word = set_bit_to(word, 23, self.up);
        let word = set_bit_to(word, 20, self.load);
        let word = set_bits_to(word, 16, 19, self.rn as u32);
        let word = set_bits_to(word, 12, 15, self.rd as u32);
        set_bits_to(word, 0, 11, self.offset)
    }

    fn fmt_offset(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.up { "" } else { "-" };
        if self.immediate {
            write!(f, "{sign}{}", ShiftedReg::decode(self.offset))
        } else {
            write!(f, "#{sign}{}", self.offset)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Branch {
    pub cond: Cond,
    /// Signed word offset, 24 bits.
    pub offset: u32,
}

impl Branch {
    pub fn decode(word: u32) -> Self {
        Branch {
            cond: Cond::from_bits(get_bits(word, 28, 31)),
            offset: get_bits(word, 0, 23),
        }
    }

    pub fn encode(&self) -> u32 {
        let word = set_bits_to(0, 28, 31, self.cond.bits());
        let word = set_bit(set_bit(word, 27), 25);
        set_bits_to(word, 0, 23, self.offset)
    }

    /// Byte distance added to the program counter when taken.
    pub fn delta(&self) -> u32 {
        sign_extend(self.offset << 2, 26)
    }
}

/// One decoded 32-bit word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    DataProcessing(DataProcessing),
    Multiply(Multiply),
    Transfer(Transfer),
    Branch(Branch),
    /// The all-zero word, and the unused `11` class.
    Halt,
}

impl Instruction {
    pub fn decode(word: u32) -> Self {
        if word == 0 {
            return Instruction::Halt;
        }
        match get_bits(word, 26, 27) {
            0b00 => {
                if !get_bit(word, 25) && get_bit(word, 7) && get_bit(word, 4) {
                    Instruction::Multiply(Multiply::decode(word))
                } else {
                    Instruction::DataProcessing(DataProcessing::decode(word))
                }
            }
            0b01 => Instruction::Transfer(Transfer::decode(word)),
            0b10 => Instruction::Branch(Branch::decode(word)),
            _ => Instruction::Halt,
        }
    }

    pub fn encode(&self) -> u32 {
        match self {
            Instruction::DataProcessing(instr) => instr.encode(),
            Instruction::Multiply(instr) => instr.encode(),
            Instruction::Transfer(instr) => instr.encode(),
            Instruction::Branch(instr) => instr.encode(),
            Instruction::Halt => 0,
        }
    }
}

fn fmt_imm(f: &mut fmt::Formatter<'_>, value: u32) -> fmt::Result {
    if value > 0xFF {
        write!(f, "#0x{value:x}")
    } else {
        write!(f, "#{value}")
    }
}

fn flag_suffix(set_flags: bool) -> &'static str {
    if set_flags {
        "s"
    } else {
        ""
    }
}

/// Disassembly in the syntax accepted by the assembler, except that branch targets are written
/// relative to the branch itself (`.+8`, `.-12`).
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::DataProcessing(dp) => {
                let name = dp.opcode.name();
                let cond = dp.cond;
                match dp.opcode {
                    Opcode::Unassigned(bits) => {
                        write!(f, "<undefined opcode 0x{bits:x}>")
                    }
                    // Always set flags, so no `s`
                    Opcode::Tst | Opcode::Teq | Opcode::Cmp => {
                        write!(f, "{name}{cond} r{}, ", dp.rn)?;
                        dp.fmt_operand2(f)
                    }
                    Opcode::Mov => {
                        write!(f, "{name}{cond}{} r{}, ", flag_suffix(dp.set_flags), dp.rd)?;
                        dp.fmt_operand2(f)
                    }
                    _ => {
                        write!(
                            f,
                            "{name}{cond}{} r{}, r{}, ",
                            flag_suffix(dp.set_flags),
                            dp.rd,
                            dp.rn
                        )?;
                        dp.fmt_operand2(f)
                    }
                }
            }
            Instruction::Multiply(mul) => {
                let s = flag_suffix(mul.set_flags);
                if mul.accumulate {
                    write!(
                        f,
                        "mla{}{s} r{}, r{}, r{}, r{}",
                        mul.cond, mul.rd, mul.rm, mul.rs, mul.rn
                    )
                } else {
                    write!(f, "mul{}{s} r{}, r{}, r{}", mul.cond, mul.rd, mul.rm, mul.rs)
                }
            }
            Instruction::Transfer(sdt) => {
                let name = if sdt.load { "ldr" } else { "str" };
                write!(f, "{name}{} r{}, [r{}", sdt.cond, sdt.rd, sdt.rn)?;
                if sdt.pre_indexed {
                    if sdt.immediate || sdt.offset != 0 {
                        f.write_str(", ")?;
                        sdt.fmt_offset(f)?;
                    }
                    f.write_str("]")
                } else {
                    f.write_str("], ")?;
                    sdt.fmt_offset(f)
                }
            }
            Instruction::Branch(br) => {
                // Relative to the branch, not the pipelined program counter
                let rel = (br.delta() as i32).wrapping_add(8);
                write!(f, "b{} .{rel:+}", br.cond)
            }
            Instruction::Halt => f.write_str("andeq r0, r0, r0"),
        }
    }
}
