// Encoding
pub mod bits;
pub mod cond;
pub mod instr;
pub use instr::Instruction;

// Assembling
mod air;
pub use air::Air;
pub mod asm;
pub use asm::{assemble, Image};
mod error;
mod lexer;
mod parser;
pub use parser::AsmParser;
mod span;
pub mod symbol;

// Running
pub mod runtime;
pub use runtime::{Fault, RunEnvironment};
pub mod state;
pub use state::MachineState;
pub mod output;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
