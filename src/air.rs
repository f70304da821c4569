use miette::Result;

use crate::asm::Image;
use crate::cond::Cond;
use crate::error;
use crate::instr::{self, encode_immediate, DataProcessing, Multiply, Opcode, ShiftKind, ShiftedReg, Transfer};
use crate::span::Span;
use crate::state::PC;
use crate::symbol::SymbolTable;

/// Assembly intermediate representation: every statement at its address, plus the labels bound
/// while reading them.
#[derive(Debug, Default)]
pub struct Air {
    stmts: Vec<(u32, AirStmt)>,
    symbols: SymbolTable,
}

impl Air {
    pub fn new() -> Self {
        Air {
            stmts: Vec::new(),
            symbols: SymbolTable::new(),
        }
    }

    /// Address the next statement will be placed at.
    pub fn next_addr(&self) -> u32 {
        self.stmts.len() as u32 * 4
    }

    /// Bind a label to the next free address. Returns the earlier address on redefinition.
    pub fn bind_label(&mut self, name: &str) -> Option<u32> {
        let addr = self.next_addr();
        self.symbols.insert(name, addr)
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) -> u32 {
        let addr = self.next_addr();
        self.stmts.push((addr, stmt));
        addr
    }

    pub fn get(&self, idx: usize) -> &AirStmt {
        &self.stmts[idx].1
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Encode every statement into its slot. Literals are appended after the last instruction in
    /// the order their loads appear.
    pub fn emit(&self, src: &str) -> Result<Image> {
        let mut image = Image::with_len(self.next_addr());
        for (addr, stmt) in &self.stmts {
            let mut ctx = EmitCtx {
                src,
                symbols: &self.symbols,
                addr: *addr,
                image: &mut image,
            };
            let word = stmt.emit(&mut ctx)?;
            image.write_word(*addr, word);
        }
        Ok(image)
    }
}

/// Everything an encoder needs besides its own operands.
pub struct EmitCtx<'a> {
    pub src: &'a str,
    pub symbols: &'a SymbolTable,
    /// Address of the statement being encoded
    pub addr: u32,
    pub image: &'a mut Image,
}

/// One assembly statement with its operands resolved as far as a single line allows.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AirStmt {
    /// `and`, `eor`, `sub`, `rsb`, `add`, `orr`
    Compute {
        opcode: Opcode,
        rd: u8,
        rn: u8,
        operand: Operand,
    },
    Move {
        rd: u8,
        operand: Operand,
    },
    /// `tst`, `teq`, `cmp`
    Compare {
        opcode: Opcode,
        rn: u8,
        operand: Operand,
    },
    /// `mul`, or `mla` when `accumulate` holds the added register
    Multiply {
        rd: u8,
        rm: u8,
        rs: u8,
        accumulate: Option<u8>,
    },
    Transfer {
        load: bool,
        rd: u8,
        addr: Address,
    },
    Branch {
        cond: Cond,
        target: Target,
    },
    /// Shift pseudo-instruction, a `mov` of a register onto itself
    Shift {
        kind: ShiftKind,
        rd: u8,
        amount: u8,
    },
    Halt,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Imm { value: u32, span: Span },
    Reg(ShiftedReg),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Address {
    /// `=value`
    Literal { value: u32, span: Span },
    /// `[rn]`, `[rn, offset]`
    Pre { rn: u8, offset: Offset },
    /// `[rn], offset`
    Post { rn: u8, offset: Offset },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Offset {
    /// At most 12 bits
    Imm { up: bool, value: u32 },
    Reg { up: bool, reg: ShiftedReg },
}

impl Offset {
    pub const ZERO: Offset = Offset::Imm { up: true, value: 0 };
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Target {
    /// `#address`
    Addr(u32),
    Label { name: String, span: Span },
}

impl AirStmt {
    pub fn emit(&self, ctx: &mut EmitCtx<'_>) -> Result<u32> {
        let word = match self {
            AirStmt::Compute {
                opcode,
                rd,
                rn,
                operand,
            } => data_processing(ctx.src, *opcode, false, *rd, *rn, operand)?,
            AirStmt::Move { rd, operand } => {
                data_processing(ctx.src, Opcode::Mov, false, *rd, 0, operand)?
            }
            AirStmt::Compare {
                opcode,
                rn,
                operand,
            } => data_processing(ctx.src, *opcode, true, 0, *rn, operand)?,
            AirStmt::Multiply {
                rd,
                rm,
                rs,
                accumulate,
            } => Multiply {
                cond: Cond::Al,
                accumulate: accumulate.is_some(),
                set_flags: false,
                rd: *rd,
                rn: accumulate.unwrap_or(0),
                rs: *rs,
                rm: *rm,
            }
            .encode(),
            AirStmt::Transfer { load, rd, addr } => transfer(ctx, *load, *rd, addr)?,
            AirStmt::Branch { cond, target } => {
                let target = match target {
                    Target::Addr(addr) => *addr,
                    Target::Label { name, span } => ctx
                        .symbols
                        .get(name)
                        .ok_or_else(|| error::asm_undefined_label(*span, ctx.src))?,
                };
                // The program counter is 8 bytes ahead when the branch executes
                let offset = (target.wrapping_sub(ctx.addr).wrapping_sub(8) as i32) >> 2;
                instr::Branch {
                    cond: *cond,
                    offset: offset as u32 & 0x00FF_FFFF,
                }
                .encode()
            }
            AirStmt::Shift { kind, rd, amount } => DataProcessing {
                cond: Cond::Al,
                immediate: false,
                opcode: Opcode::Mov,
                set_flags: false,
                rn: 0,
                rd: *rd,
                operand2: ShiftedReg {
                    rm: *rd,
                    kind: *kind,
                    amount: *amount,
                }
                .encode(),
            }
            .encode(),
            AirStmt::Halt => 0,
        };
        Ok(word)
    }
}

fn data_processing(
    src: &str,
    opcode: Opcode,
    set_flags: bool,
    rd: u8,
    rn: u8,
    operand: &Operand,
) -> Result<u32> {
    let (immediate, operand2) = match operand {
        Operand::Imm { value, span } => {
            let operand2 =
                encode_immediate(*value).ok_or_else(|| error::asm_immediate(*span, src, *value))?;
            (true, operand2)
        }
        Operand::Reg(reg) => (false, reg.encode()),
    };
    Ok(DataProcessing {
        cond: Cond::Al,
        immediate,
        opcode,
        set_flags,
        rn,
        rd,
        operand2,
    }
    .encode())
}

fn transfer(ctx: &mut EmitCtx<'_>, load: bool, rd: u8, addr: &Address) -> Result<u32> {
    let (pre_indexed, rn, offset) = match *addr {
        Address::Literal { value, span } => {
            // Small constants need no pool entry
            if value <= 0xFF {
                return data_processing(ctx.src, Opcode::Mov, false, rd, 0, &Operand::Imm { value, span });
            }
            let offset = ctx.image.len() as i64 - ctx.addr as i64 - 8;
            if offset.abs() > 0xFFF {
                return Err(error::asm_offset_range(span, ctx.src, offset));
            }
            ctx.image.push_word(value);
            let offset = Offset::Imm {
                up: offset >= 0,
                value: offset.unsigned_abs() as u32,
            };
            (true, PC as u8, offset)
        }
        Address::Pre { rn, offset } => (true, rn, offset),
        Address::Post { rn, offset } => (false, rn, offset),
    };

    let (immediate, up, offset) = match offset {
        Offset::Imm { up, value } => (false, up, value),
        Offset::Reg { up, reg } => (true, up, reg.encode()),
    };
    Ok(Transfer {
        cond: Cond::Al,
        immediate,
        pre_indexed,
        up,
        load,
        rn,
        rd,
        offset,
    }
    .encode())
}
