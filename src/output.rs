use std::cell::RefCell;
use std::fmt;
use std::str::Chars;

use colored::Colorize;

use crate::instr::Instruction;
use crate::runtime::Fault;
use crate::state::{MachineState, CPSR, PC};

/// Pipeline slot shown by the trace.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Slot {
    Execute,
    /// Dropped after a taken branch.
    Flush,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Strip colour from diagnostics printed by the emulator. Returns the previous setting.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

pub fn report_fault(fault: &Fault) {
    let line = format!("{} {fault}", "Error:".red().bold());
    eprint_line(&line);
}

pub fn trace(addr: u32, word: u32, slot: Slot) {
    let instr = Instruction::decode(word);
    let location = format!("0x{addr:08x}:").dimmed();
    let line = match slot {
        Slot::Execute => format!("{location} {word:08x} {instr}"),
        Slot::Flush => format!("{location} {word:08x} {instr} {}", "(flushed)".yellow()),
    };
    eprint_line(&line);
}

fn eprint_line(line: &str) {
    if is_minimal() {
        eprintln!("{}", Decolored::new(line).collect::<String>());
    } else {
        eprintln!("{line}");
    }
}

/// Final machine state as printed after emulation.
///
/// Registers are shown as signed decimal and hex. Memory is listed one aligned word per line,
/// skipping zero words, with bytes in memory order.
pub struct Dump<'a>(pub &'a MachineState);

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        let registers = state.registers();

        writeln!(f, "Registers:")?;
        for (i, &value) in registers.iter().enumerate().take(13) {
            write_register(f, &format!("${i}"), value)?;
        }
        write_register(f, "PC", registers[PC])?;
        write_register(f, "CPSR", registers[CPSR])?;

        writeln!(f, "Non-zero memory:")?;
        for (i, bytes) in state.memory().chunks_exact(4).enumerate() {
            if bytes.iter().all(|&b| b == 0) {
                continue;
            }
            write!(f, "0x{:08x}: 0x", i * 4)?;
            for byte in bytes {
                write!(f, "{byte:02x}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_register(f: &mut fmt::Formatter<'_>, name: &str, value: u32) -> fmt::Result {
    writeln!(f, "{name:<4}: {:>10} (0x{value:08x})", value as i32)
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl Iterator for Decolored<'_> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip escape sequences up to and including the final 'm'
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}
