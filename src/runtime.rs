use std::fmt;

use miette::Result;

use crate::bits::get_bit;
use crate::instr::{
    decode_immediate, Branch, DataProcessing, Instruction, Multiply, Opcode, ShiftKind, ShiftedReg,
    Transfer,
};
use crate::output::{self, Slot};
use crate::state::{MachineState, MEMORY_SIZE};

/// What the pipeline does with the word fetched during the current cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    /// Discard it; the program counter moved after it was fetched.
    Skip,
    /// Execute it next cycle.
    Continue,
    /// A halt was executed.
    Stop,
}

/// Guest program error. Reported, but the emulator keeps running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fault {
    Memory { addr: u32 },
    Branch { target: u32 },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Memory { addr } => {
                write!(f, "Out of bounds memory access at address 0x{addr:08x}")
            }
            Fault::Branch { target } => {
                write!(f, "Branch target out of bounds at address 0x{target:08x}")
            }
        }
    }
}

/// Owns the machine for one emulation run.
pub struct RunEnvironment {
    state: MachineState,
    faults: Vec<Fault>,
    trace: bool,
}

impl RunEnvironment {
    pub fn new(state: MachineState) -> Self {
        RunEnvironment {
            state,
            faults: Vec::new(),
            trace: false,
        }
    }

    /// Load a flat binary image at address 0.
    pub fn from_raw(image: &[u8]) -> Result<Self> {
        Ok(Self::new(MachineState::from_image(image)?))
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// Faults raised so far, oldest first.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Fetch, decode and execute until a halt or until the program counter leaves memory.
    ///
    /// The executing instruction always sees the program counter 8 bytes past its own address:
    /// one word sits fetched but not yet decoded, one decoded but not yet executed. A taken branch
    /// invalidates the decoded word, which is dropped on the following cycle.
    pub fn run(&mut self) {
        let mut fetched = self.fetch();
        let mut decoded: Option<(u32, u32)> = None;
        let mut step = Step::Skip;

        while (self.state.pc() as usize) < MEMORY_SIZE && step != Step::Stop {
            step = match step {
                Step::Continue => match decoded {
                    Some((addr, word)) => {
                        if self.trace {
                            output::trace(addr, word, Slot::Execute);
                        }
                        self.execute(Instruction::decode(word))
                    }
                    None => Step::Continue,
                },
                Step::Skip => {
                    if let (true, Some((addr, word))) = (self.trace, decoded) {
                        output::trace(addr, word, Slot::Flush);
                    }
                    Step::Continue
                }
                Step::Stop => unreachable!("loop exits on stop"),
            };

            if step != Step::Stop {
                decoded = Some(fetched);
                fetched = self.fetch();
            }
        }
    }

    /// Read the word at the program counter and advance past it.
    fn fetch(&mut self) -> (u32, u32) {
        let pc = self.state.pc();
        // Past the last full word reads as a halt
        let word = self.state.read_word(pc).unwrap_or(0);
        self.state.set_pc(pc.wrapping_add(4));
        (pc, word)
    }

    /// Apply one decoded instruction, if its condition holds.
    pub fn execute(&mut self, instr: Instruction) -> Step {
        let flags = self.state.flags();
        match instr {
            Instruction::Halt => Step::Stop,
            Instruction::DataProcessing(dp) => {
                if dp.cond.passes(flags) {
                    self.data_processing(dp);
                }
                Step::Continue
            }
            Instruction::Multiply(mul) => {
                if mul.cond.passes(flags) {
                    self.multiply(mul);
                }
                Step::Continue
            }
            Instruction::Transfer(sdt) => {
                if sdt.cond.passes(flags) {
                    self.transfer(sdt);
                }
                Step::Continue
            }
            Instruction::Branch(br) => {
                if br.cond.passes(flags) && self.branch(br) {
                    Step::Skip
                } else {
                    Step::Continue
                }
            }
        }
    }

    /// Value of a shifted register operand and the last bit shifted out, if anything shifted.
    fn shift(&self, operand: ShiftedReg) -> (u32, Option<bool>) {
        let value = self.state.reg(operand.rm);
        if operand.amount == 0 {
            return (value, None);
        }
        let (value, carry) = operand.kind.apply(value, operand.amount as u32);
        (value, Some(carry))
    }

    fn data_processing(&mut self, dp: DataProcessing) {
        let (op2, shift_carry) = if dp.immediate {
            (decode_immediate(dp.operand2), None)
        } else {
            let operand = ShiftedReg::decode(dp.operand2);
            let (value, carry) = self.shift(operand);
            // Only left shifts feed the carry flag, and they set C rather than N
            (value, carry.filter(|_| operand.kind == ShiftKind::Lsl))
        };
        let op1 = self.state.reg(dp.rn);

        let (result, alu_carry) = match dp.opcode {
            Opcode::And | Opcode::Tst => (op1 & op2, None),
            Opcode::Eor | Opcode::Teq => (op1 ^ op2, None),
            // Carry is "no borrow"
            Opcode::Sub | Opcode::Cmp => (op1.wrapping_sub(op2), Some(op1 >= op2)),
            Opcode::Rsb => (op2.wrapping_sub(op1), Some(op2 >= op1)),
            Opcode::Add => {
                let (sum, overflow) = op1.overflowing_add(op2);
                (sum, Some(overflow))
            }
            Opcode::Orr => (op1 | op2, None),
            Opcode::Mov => (op2, None),
            Opcode::Unassigned(_) => return,
        };

        if dp.opcode.writes_result() {
            self.state.set_reg(dp.rd, result);
        }

        if dp.set_flags {
            let mut flags = self.state.flags();
            if let Some(carry) = alu_carry.or(shift_carry) {
                flags.c = carry;
            }
            flags.z = result == 0;
            flags.n = get_bit(result, 31);
            self.state.set_flags(flags);
        }
    }

    fn multiply(&mut self, mul: Multiply) {
        let mut result = self.state.reg(mul.rm).wrapping_mul(self.state.reg(mul.rs));
        if mul.accumulate {
            result = result.wrapping_add(self.state.reg(mul.rn));
        }

        if mul.set_flags {
            // N and Z are only ever set here, and at most one of them
            let mut flags = self.state.flags();
            if (result as i32) < 0 {
                flags.n = true;
            } else if result == 0 {
                flags.z = true;
            }
            self.state.set_flags(flags);
        }

        self.state.set_reg(mul.rd, result);
    }

    fn transfer(&mut self, sdt: Transfer) {
        let offset = if sdt.immediate {
            self.shift(ShiftedReg::decode(sdt.offset)).0
        } else {
            sdt.offset
        };
        let base = self.state.reg(sdt.rn);
        let moved = if sdt.up {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if sdt.pre_indexed { moved } else { base };

        // Post-indexed write-back happens even when the access faults
        if !sdt.pre_indexed {
            self.state.set_reg(sdt.rn, moved);
        }

        if !MachineState::word_in_bounds(addr) {
            self.fault(Fault::Memory { addr });
            return;
        }

        if sdt.load {
            if let Some(val) = self.state.read_word(addr) {
                self.state.set_reg(sdt.rd, val);
            }
        } else {
            let val = self.state.reg(sdt.rd);
            self.state.write_word(addr, val);
        }
    }

    /// Returns whether the program counter was moved.
    fn branch(&mut self, br: Branch) -> bool {
        let target = self.state.pc().wrapping_add(br.delta());
        if target as usize >= MEMORY_SIZE {
            self.fault(Fault::Branch { target });
            return false;
        }
        self.state.set_pc(target);
        true
    }

    fn fault(&mut self, fault: Fault) {
        output::report_fault(&fault);
        self.faults.push(fault);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cond::{Cond, Flags};

    fn image(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    fn run(words: &[u32]) -> RunEnvironment {
        let mut env = RunEnvironment::from_raw(&image(words)).unwrap();
        env.run();
        env
    }

    fn dp(opcode: Opcode, set_flags: bool, rd: u8, rn: u8, operand2: u32) -> Instruction {
        Instruction::DataProcessing(DataProcessing {
            cond: Cond::Al,
            immediate: false,
            opcode,
            set_flags,
            rn,
            rd,
            operand2,
        })
    }

    fn dp_imm(opcode: Opcode, set_flags: bool, rd: u8, rn: u8, value: u32) -> Instruction {
        Instruction::DataProcessing(DataProcessing {
            cond: Cond::Al,
            immediate: true,
            opcode,
            set_flags,
            rn,
            rd,
            operand2: value,
        })
    }

    #[test]
    fn executes_in_order() {
        // mov r0, #1 / mov r0, #2 / halt
        let env = run(&[0xE3A0_0001, 0xE3A0_0002]);
        assert_eq!(env.state().reg(0), 2);
        // Halt at 0x8 executes with the program counter 8 bytes ahead
        assert_eq!(env.state().pc(), 0x10);
        assert!(env.faults().is_empty());
    }

    #[test]
    fn taken_branch_discards_stale_fetch() {
        // b skip / mov r1, #1 / skip: mov r0, #2 / halt
        let env = run(&[0xEA00_0000, 0xE3A0_1001, 0xE3A0_0002]);
        assert_eq!(env.state().reg(0), 2);
        assert_eq!(env.state().reg(1), 0);
    }

    #[test]
    fn untaken_branch_falls_through() {
        // cmp r0, #1 / beq +8 / mov r1, #1 / mov r2, #2 / halt
        let env = run(&[0xE350_0001, 0x0A00_0000, 0xE3A0_1001, 0xE3A0_2002]);
        assert_eq!(env.state().reg(1), 1);
        assert_eq!(env.state().reg(2), 2);
    }

    #[test]
    fn loops_until_counter_expires() {
        // mov r0, #3 / loop: sub r0, r0, #1 / add r1, r1, #2 / cmp r0, #0 / bne loop / halt
        let env = run(&[0xE3A0_0003, 0xE240_0001, 0xE281_1002, 0xE350_0000, 0x1AFF_FFFB]);
        assert_eq!(env.state().reg(0), 0);
        assert_eq!(env.state().reg(1), 6);
        assert!(env.state().flags().z);
    }

    #[test]
    fn out_of_bounds_store_is_not_fatal() {
        // mov r0, #5 / mov r1, #0 / sub r1, r1, #1 / str r0, [r1] / mov r2, #7 / halt
        let program = [0xE3A0_0005, 0xE3A0_1000, 0xE241_1001, 0xE581_0000, 0xE3A0_2007];
        let env = run(&program);
        assert_eq!(env.faults(), &[Fault::Memory { addr: 0xFFFF_FFFF }]);
        assert_eq!(env.state().reg(1), 0xFFFF_FFFF);
        assert_eq!(env.state().reg(2), 7);
        assert_eq!(&env.state().memory()[..20], image(&program).as_slice());
        assert!(env.state().memory()[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn program_counter_leaving_memory_ends_run() {
        // b to the last word of memory, which holds `mov r0, #1`
        let mut state = MachineState::new();
        let offset = (0xFFFC - 8) >> 2;
        state.write_word(0, 0xEA00_0000 | offset);
        state.write_word(0xFFFC, 0xE3A0_0001);
        let mut env = RunEnvironment::new(state);
        env.run();
        assert_eq!(env.state().reg(0), 0);
        assert_eq!(env.state().pc(), 0x1_0000);
    }

    #[test]
    fn compare_sets_zero_and_carry() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(0, 5);
        env.execute(dp_imm(Opcode::Cmp, true, 0, 0, 5));
        assert_eq!(env.state().cpsr(), 0x6000_0000);
        assert_eq!(env.state().reg(0), 5);

        env.execute(dp_imm(Opcode::Cmp, true, 0, 0, 6));
        assert_eq!(
            env.state().flags(),
            Flags {
                n: true,
                z: false,
                c: false,
                v: false
            }
        );
    }

    #[test]
    fn alu_operations() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0b1100);
        env.state_mut().set_reg(2, 0b1010);

        let cases = [
            (Opcode::And, 0b1000),
            (Opcode::Eor, 0b0110),
            (Opcode::Sub, 2),
            (Opcode::Rsb, (-2i32) as u32),
            (Opcode::Add, 22),
            (Opcode::Orr, 0b1110),
            (Opcode::Mov, 0b1010),
        ];
        for (opcode, expected) in cases {
            env.execute(dp(opcode, false, 3, 1, 2));
            assert_eq!(env.state().reg(3), expected, "{opcode:?}");
        }
        // Flags untouched without `s`
        assert_eq!(env.state().cpsr(), 0);

        env.state_mut().set_reg(3, 0xAA);
        for opcode in [Opcode::Tst, Opcode::Teq] {
            env.execute(dp(opcode, true, 3, 1, 2));
            assert_eq!(env.state().reg(3), 0xAA, "{opcode:?} wrote a result");
        }
    }

    #[test]
    fn carry_follows_arithmetic() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0xFFFF_FFFF);
        env.execute(dp_imm(Opcode::Add, true, 2, 1, 1));
        assert_eq!(env.state().reg(2), 0);
        assert_eq!(env.state().cpsr(), 0x6000_0000);

        env.state_mut().set_reg(1, 1);
        env.execute(dp_imm(Opcode::Sub, true, 2, 1, 2));
        assert_eq!(env.state().reg(2), 0xFFFF_FFFF);
        assert_eq!(env.state().cpsr(), 0x8000_0000);

        env.execute(dp_imm(Opcode::Rsb, true, 2, 1, 2));
        assert_eq!(env.state().reg(2), 1);
        assert_eq!(env.state().cpsr(), 0x2000_0000);
    }

    #[test]
    fn carry_uses_operands_read_before_write() {
        // subs r1, r1, #1 with r1 = 1: the old r1 is compared, not the result
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 1);
        env.execute(dp_imm(Opcode::Sub, true, 1, 1, 1));
        assert_eq!(env.state().reg(1), 0);
        assert!(env.state().flags().c);
        assert!(env.state().flags().z);
    }

    #[test]
    fn rotated_immediate_operand() {
        let mut env = RunEnvironment::new(MachineState::new());
        // 0xFF rotated right by 8
        env.execute(dp_imm(Opcode::Mov, false, 0, 0, 0x4FF));
        assert_eq!(env.state().reg(0), 0xFF00_0000);
    }

    #[test]
    fn shifted_register_operand() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0x8000_00F0);
        let cases = [
            (ShiftKind::Lsl, 4, 0x0000_0F00),
            (ShiftKind::Lsr, 4, 0x0800_000F),
            (ShiftKind::Asr, 4, 0xF800_000F),
            (ShiftKind::Ror, 8, 0xF080_0000),
            (ShiftKind::Ror, 0, 0x8000_00F0),
        ];
        for (kind, amount, expected) in cases {
            let operand = ShiftedReg { rm: 1, kind, amount }.encode();
            env.execute(dp(Opcode::Mov, false, 0, 0, operand));
            assert_eq!(env.state().reg(0), expected, "{kind:?} #{amount}");
        }
    }

    /// A flag-setting logical operation on a left-shifted register takes C from the last bit
    /// shifted out. Arithmetic operations replace it with their own carry.
    ///
    /// Setting C here is a deliberate change: writing the shifted-out bit to N, where the N/Z
    /// update immediately overwrites it, would leave the flags untouched.
    #[test]
    fn left_shift_carry_out() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0x8000_0001);
        let lsl_1 = ShiftedReg {
            rm: 1,
            kind: ShiftKind::Lsl,
            amount: 1,
        }
        .encode();

        env.execute(dp(Opcode::Mov, true, 0, 0, lsl_1));
        assert_eq!(env.state().reg(0), 2);
        assert_eq!(env.state().cpsr(), 0x2000_0000);

        // 0 + 2 does not carry
        env.execute(dp(Opcode::Add, true, 0, 2, lsl_1));
        assert_eq!(env.state().cpsr(), 0);

        // Right shifts leave C alone
        env.state_mut().set_reg(1, 0x1);
        let lsr_1 = ShiftedReg {
            rm: 1,
            kind: ShiftKind::Lsr,
            amount: 1,
        }
        .encode();
        env.execute(dp(Opcode::Mov, true, 0, 0, lsr_1));
        assert_eq!(env.state().cpsr(), 0x4000_0000);
    }

    #[test]
    fn unassigned_opcode_does_nothing() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 9);
        let step = env.execute(dp_imm(Opcode::Unassigned(0x5), true, 1, 1, 1));
        assert_eq!(step, Step::Continue);
        assert_eq!(env.state().reg(1), 9);
        assert_eq!(env.state().cpsr(), 0);
    }

    #[test]
    fn reserved_condition_never_executes() {
        let mut env = RunEnvironment::new(MachineState::new());
        let instr = Instruction::DataProcessing(DataProcessing {
            cond: Cond::Reserved(0xF),
            immediate: true,
            opcode: Opcode::Mov,
            set_flags: false,
            rn: 0,
            rd: 0,
            operand2: 1,
        });
        assert_eq!(env.execute(instr), Step::Continue);
        assert_eq!(env.state().reg(0), 0);
    }

    #[test]
    fn multiply_products() {
        for i in -10i32..10 {
            for j in -10i32..10 {
                let mut env = RunEnvironment::new(MachineState::new());
                env.state_mut().set_reg(0, i as u32);
                env.state_mut().set_reg(5, j as u32);
                let step = env.execute(Instruction::Multiply(Multiply {
                    cond: Cond::Ge,
                    accumulate: false,
                    set_flags: true,
                    rd: 1,
                    rn: 2,
                    rs: 0,
                    rm: 5,
                }));
                assert_eq!(step, Step::Continue);
                assert_eq!(env.state().reg(1), (i * j) as u32);
                let flags = env.state().flags();
                assert_eq!(flags.n, i * j < 0, "{i} * {j}");
                assert_eq!(flags.z, i * j == 0, "{i} * {j}");
            }
        }
    }

    #[test]
    fn multiply_accumulates() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 6);
        env.state_mut().set_reg(2, 7);
        env.state_mut().set_reg(3, 100);
        env.execute(Instruction::Multiply(Multiply {
            cond: Cond::Al,
            accumulate: true,
            set_flags: false,
            rd: 4,
            rn: 3,
            rs: 2,
            rm: 1,
        }));
        assert_eq!(env.state().reg(4), 142);
    }

    #[test]
    fn multiply_flags_are_only_ever_set() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_flags(Flags {
            n: true,
            z: true,
            c: false,
            v: false,
        });
        env.state_mut().set_reg(1, 3);
        env.state_mut().set_reg(2, 4);
        env.execute(Instruction::Multiply(Multiply {
            cond: Cond::Al,
            accumulate: false,
            set_flags: true,
            rd: 0,
            rn: 0,
            rs: 2,
            rm: 1,
        }));
        assert_eq!(env.state().reg(0), 12);
        assert_eq!(env.state().cpsr(), 0xC000_0000);
    }

    fn transfer(load: bool, pre_indexed: bool, up: bool, rn: u8, rd: u8, offset: u32) -> Instruction {
        Instruction::Transfer(Transfer {
            cond: Cond::Al,
            immediate: false,
            pre_indexed,
            up,
            load,
            rn,
            rd,
            offset,
        })
    }

    #[test]
    fn pre_indexed_transfer_keeps_base() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(0, 0xCAFE_BABE);
        env.state_mut().set_reg(1, 0x104);
        env.execute(transfer(false, true, false, 1, 0, 4));
        assert_eq!(env.state().read_word(0x100), Some(0xCAFE_BABE));
        assert_eq!(env.state().memory()[0x100], 0xBE);
        assert_eq!(env.state().reg(1), 0x104);

        env.execute(transfer(true, true, true, 1, 2, 0));
        assert_eq!(env.state().reg(2), 0);
        env.execute(transfer(true, true, false, 1, 2, 4));
        assert_eq!(env.state().reg(2), 0xCAFE_BABE);
    }

    #[test]
    fn post_indexed_transfer_writes_back() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(0, 0x1234);
        env.state_mut().set_reg(1, 0x200);
        env.execute(transfer(false, false, true, 1, 0, 4));
        assert_eq!(env.state().read_word(0x200), Some(0x1234));
        assert_eq!(env.state().reg(1), 0x204);
    }

    #[test]
    fn register_offset_transfer() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().write_word(0x10C, 77);
        env.state_mut().set_reg(1, 0x100);
        env.state_mut().set_reg(2, 3);
        let offset = ShiftedReg {
            rm: 2,
            kind: ShiftKind::Lsl,
            amount: 2,
        }
        .encode();
        env.execute(Instruction::Transfer(Transfer {
            cond: Cond::Al,
            immediate: true,
            pre_indexed: true,
            up: true,
            load: true,
            rn: 1,
            rd: 0,
            offset,
        }));
        assert_eq!(env.state().reg(0), 77);
    }

    #[test]
    fn faulting_transfer_still_writes_back() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0xFFFE);
        env.state_mut().set_reg(2, 0x55);
        env.execute(transfer(true, false, true, 1, 2, 4));
        assert_eq!(env.faults(), &[Fault::Memory { addr: 0xFFFE }]);
        assert_eq!(env.state().reg(1), 0x1_0002);
        assert_eq!(env.state().reg(2), 0x55);

        env.state_mut().set_reg(1, 0x1_0000);
        env.execute(transfer(false, false, true, 1, 0, 4));
        assert_eq!(env.faults()[1], Fault::Memory { addr: 0x1_0000 });
        assert_eq!(env.state().reg(1), 0x1_0004);
    }

    #[test]
    fn faulting_pre_indexed_transfer_has_no_effect() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(1, 0xFFF8);
        env.state_mut().set_reg(2, 0x55);
        env.execute(transfer(true, true, true, 1, 2, 8));
        assert_eq!(env.faults(), &[Fault::Memory { addr: 0x1_0000 }]);
        assert_eq!(env.state().reg(1), 0xFFF8);
        assert_eq!(env.state().reg(2), 0x55);
    }

    #[test]
    fn word_must_fit_in_memory() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_reg(2, 0x55);
        for addr in [0xFFFD, 0xFFFE, 0xFFFF] {
            env.state_mut().set_reg(1, addr);
            env.execute(transfer(true, true, true, 1, 2, 0));
            assert_eq!(env.faults().last(), Some(&Fault::Memory { addr }));
            assert_eq!(env.state().reg(2), 0x55);
        }
        assert_eq!(env.faults().len(), 3);

        env.state_mut().set_reg(1, 0xFFFC);
        env.execute(transfer(true, true, true, 1, 2, 0));
        assert_eq!(env.faults().len(), 3);
        assert_eq!(env.state().reg(2), 0);
    }

    #[test]
    fn branch_moves_program_counter() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_pc(0x14);
        let forward = Instruction::Branch(Branch {
            cond: Cond::Ge,
            offset: 0x14,
        });
        assert_eq!(env.execute(forward), Step::Skip);
        assert_eq!(env.state().pc(), 0x64);

        let back = Instruction::Branch(Branch {
            cond: Cond::Ge,
            offset: 0x00FF_FFEC,
        });
        assert_eq!(env.execute(back), Step::Skip);
        assert_eq!(env.state().pc(), 0x14);
    }

    #[test]
    fn branch_out_of_bounds_is_reported() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_pc(0x8);
        let instr = Instruction::Branch(Branch {
            cond: Cond::Al,
            offset: 0x00FF_FFFC,
        });
        assert_eq!(env.execute(instr), Step::Continue);
        assert_eq!(env.state().pc(), 0x8);
        assert_eq!(env.faults(), &[Fault::Branch { target: 0xFFFF_FFF8 }]);
    }

    #[test]
    fn failed_condition_does_not_branch() {
        let mut env = RunEnvironment::new(MachineState::new());
        env.state_mut().set_pc(0x8);
        let instr = Instruction::Branch(Branch {
            cond: Cond::Eq,
            offset: 0x10,
        });
        assert_eq!(env.execute(instr), Step::Continue);
        assert_eq!(env.state().pc(), 0x8);
    }
}
