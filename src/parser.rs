use miette::Result;

use crate::air::{Address, Air, AirStmt, Offset, Operand, Target};
use crate::error;
use crate::instr::{ShiftKind, ShiftedReg};
use crate::lexer::{parse_int, tokenize, Token, TokenKind};
use crate::symbol::Mnemonic;

/// First pass: reads every line, binds labels to addresses and turns instructions into AIR.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser { src }
    }

    pub fn parse(self) -> Result<Air> {
        let mut air = Air::new();
        let mut base = 0;
        for line in self.src.split_inclusive('\n') {
            let mut parser = LineParser::new(self.src, line, base);
            base += line.len();

            if let Some(label) = parser.label() {
                let name = &self.src[label.span.range()];
                if let Some(first) = air.bind_label(name) {
                    return Err(error::parse_duplicate_label(label.span, self.src, first));
                }
            }
            // Blank and label-only lines take no space
            if parser.at_eof() {
                continue;
            }
            air.add_stmt(parser.statement()?);
        }
        Ok(air)
    }
}

/// Operand parser over the tokens of a single line.
pub struct LineParser<'a> {
    src: &'a str,
    /// Always ends with `Eof`
    toks: Vec<Token>,
    pos: usize,
}

impl<'a> LineParser<'a> {
    pub fn new(src: &'a str, line: &str, base: usize) -> Self {
        LineParser {
            src,
            toks: tokenize(line, base),
            pos: 0,
        }
    }

    fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token {
        self.toks[(self.pos + n).min(self.toks.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn text(&self, tok: Token) -> &'a str {
        &self.src[tok.span.range()]
    }

    pub fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Consume a leading `name:` and return the name token.
    pub fn label(&mut self) -> Option<Token> {
        if self.peek().kind == TokenKind::Ident && self.peek_nth(1).kind == TokenKind::Colon {
            let name = self.next();
            self.next();
            Some(name)
        } else {
            None
        }
    }

    /// Parse the instruction making up the rest of the line.
    pub fn statement(&mut self) -> Result<AirStmt> {
        let head = self.next();
        if head.kind != TokenKind::Ident {
            return Err(error::parse_generic_unexpected(self.src, "mnemonic", head));
        }
        let mnemonic: Mnemonic = self
            .text(head)
            .parse()
            .map_err(|_| error::parse_unknown_mnemonic(head.span, self.src))?;

        let stmt = match mnemonic {
            Mnemonic::Compute(opcode) => {
                let rd = self.reg()?;
                self.expect_comma()?;
                let rn = self.reg()?;
                self.expect_comma()?;
                AirStmt::Compute {
                    opcode,
                    rd,
                    rn,
                    operand: self.operand2()?,
                }
            }
            Mnemonic::Mov => {
                let rd = self.reg()?;
                self.expect_comma()?;
                AirStmt::Move {
                    rd,
                    operand: self.operand2()?,
                }
            }
            Mnemonic::Compare(opcode) => {
                let rn = self.reg()?;
                self.expect_comma()?;
                AirStmt::Compare {
                    opcode,
                    rn,
                    operand: self.operand2()?,
                }
            }
            Mnemonic::Mul | Mnemonic::Mla => {
                let rd = self.reg()?;
                self.expect_comma()?;
                let rm = self.reg()?;
                self.expect_comma()?;
                let rs = self.reg()?;
                let accumulate = if mnemonic == Mnemonic::Mla {
                    self.expect_comma()?;
                    Some(self.reg()?)
                } else {
                    None
                };
                AirStmt::Multiply {
                    rd,
                    rm,
                    rs,
                    accumulate,
                }
            }
            Mnemonic::Ldr | Mnemonic::Str => {
                let load = mnemonic == Mnemonic::Ldr;
                let rd = self.reg()?;
                self.expect_comma()?;
                let addr = self.address()?;
                if let (false, Address::Literal { span, .. }) = (load, addr) {
                    return Err(error::asm_literal_store(span, self.src));
                }
                AirStmt::Transfer { load, rd, addr }
            }
            Mnemonic::Branch(cond) => AirStmt::Branch {
                cond,
                target: self.target()?,
            },
            Mnemonic::Shift(kind) => {
                let rd = self.reg()?;
                self.expect_comma()?;
                AirStmt::Shift {
                    kind,
                    rd,
                    amount: self.shift_amount()?,
                }
            }
            Mnemonic::Andeq => {
                self.reg()?;
                self.expect_comma()?;
                self.reg()?;
                self.expect_comma()?;
                self.reg()?;
                AirStmt::Halt
            }
        };

        let tok = self.next();
        if tok.kind != TokenKind::Eof {
            return Err(error::parse_generic_unexpected(self.src, "end of line", tok));
        }
        Ok(stmt)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        let tok = self.next();
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(error::parse_generic_unexpected(self.src, expected, tok))
        }
    }

    fn expect_comma(&mut self) -> Result<()> {
        self.expect(TokenKind::Comma, "','").map(|_| ())
    }

    fn reg(&mut self) -> Result<u8> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Reg(reg) => Ok(reg),
            _ => Err(error::parse_generic_unexpected(self.src, "register", tok)),
        }
    }

    /// Signed value of an `Imm` or `Lit` token.
    fn int(&self, tok: Token) -> Result<i64> {
        // Skip the `#` or `=`
        parse_int(&self.text(tok)[1..]).map_err(|e| error::parse_bad_lit(tok.span, self.src, e))
    }

    /// A 32-bit value; negative numbers wrap to their two's complement.
    fn word(&self, tok: Token) -> Result<u32> {
        let value = self.int(tok)?;
        if !(i32::MIN as i64..=u32::MAX as i64).contains(&value) {
            return Err(error::parse_lit_range(tok.span, self.src, u32::MAX));
        }
        Ok(value as u32)
    }

    fn operand2(&mut self) -> Result<Operand> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Imm => {
                self.next();
                Ok(Operand::Imm {
                    value: self.word(tok)?,
                    span: tok.span,
                })
            }
            TokenKind::Reg(_) => Ok(Operand::Reg(self.shifted_reg()?)),
            _ => Err(error::parse_generic_unexpected(
                self.src,
                "register or immediate",
                tok,
            )),
        }
    }

    /// `rm` with an optional `, <kind> #n`.
    fn shifted_reg(&mut self) -> Result<ShiftedReg> {
        let rm = self.reg()?;
        if self.peek().kind != TokenKind::Comma || self.peek_nth(1).kind != TokenKind::Ident {
            return Ok(ShiftedReg {
                rm,
                kind: ShiftKind::Lsl,
                amount: 0,
            });
        }
        self.next();
        let tok = self.next();
        let kind: ShiftKind = self
            .text(tok)
            .parse()
            .map_err(|_| error::parse_generic_unexpected(self.src, "shift kind", tok))?;
        Ok(ShiftedReg {
            rm,
            kind,
            amount: self.shift_amount()?,
        })
    }

    fn shift_amount(&mut self) -> Result<u8> {
        let tok = self.expect(TokenKind::Imm, "shift amount")?;
        let amount = self.int(tok)?;
        if !(0..=31).contains(&amount) {
            return Err(error::parse_lit_range(tok.span, self.src, 31));
        }
        Ok(amount as u8)
    }

    fn address(&mut self) -> Result<Address> {
        let tok = self.peek();
        if tok.kind == TokenKind::Lit {
            self.next();
            return Ok(Address::Literal {
                value: self.word(tok)?,
                span: tok.span,
            });
        }

        self.expect(TokenKind::OpenBracket, "'[' or '=value'")?;
        let rn = self.reg()?;
        if self.peek().kind == TokenKind::CloseBracket {
            self.next();
            if self.peek().kind == TokenKind::Comma {
                self.next();
                return Ok(Address::Post {
                    rn,
                    offset: self.offset()?,
                });
            }
            return Ok(Address::Pre {
                rn,
                offset: Offset::ZERO,
            });
        }
        self.expect_comma()?;
        let offset = self.offset()?;
        self.expect(TokenKind::CloseBracket, "']'")?;
        Ok(Address::Pre { rn, offset })
    }

    fn offset(&mut self) -> Result<Offset> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Imm => {
                self.next();
                let value = self.int(tok)?;
                if value.abs() > 0xFFF {
                    return Err(error::asm_offset_range(tok.span, self.src, value));
                }
                Ok(Offset::Imm {
                    up: value >= 0,
                    value: value.unsigned_abs() as u32,
                })
            }
            TokenKind::Minus => {
                self.next();
                Ok(Offset::Reg {
                    up: false,
                    reg: self.shifted_reg()?,
                })
            }
            TokenKind::Reg(_) => Ok(Offset::Reg {
                up: true,
                reg: self.shifted_reg()?,
            }),
            _ => Err(error::parse_generic_unexpected(self.src, "offset", tok)),
        }
    }

    fn target(&mut self) -> Result<Target> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Ident => Ok(Target::Label {
                name: self.text(tok).to_owned(),
                span: tok.span,
            }),
            TokenKind::Imm => Ok(Target::Addr(self.word(tok)?)),
            _ => Err(error::parse_generic_unexpected(
                self.src,
                "label or #address",
                tok,
            )),
        }
    }
}
