use miette::{bail, Result};

use crate::cond::Flags;

/// Size of the emulated byte memory.
pub const MEMORY_SIZE: usize = 1 << 16;
/// r0-r12, two unused slots, the program counter, and the CPSR.
pub const REGISTER_COUNT: usize = 17;
pub const PC: usize = 15;
pub const CPSR: usize = 16;

/// Complete machine state: flat byte memory and the register file.
pub struct MachineState {
    mem: Box<[u8]>,
    reg: [u32; REGISTER_COUNT],
}

impl MachineState {
    pub fn new() -> Self {
        MachineState {
            mem: vec![0; MEMORY_SIZE].into_boxed_slice(),
            reg: [0; REGISTER_COUNT],
        }
    }

    /// Place a binary image at address 0.
    pub fn from_image(image: &[u8]) -> Result<Self> {
        if image.len() > MEMORY_SIZE {
            bail!(
                code = "load::too_large",
                help = format!("images are loaded at address 0 and may be at most {MEMORY_SIZE} bytes"),
                "Binary of {} bytes does not fit in emulated memory",
                image.len()
            );
        }
        let mut state = MachineState::new();
        state.mem[..image.len()].copy_from_slice(image);
        Ok(state)
    }

    #[inline]
    pub fn reg(&self, index: u8) -> u32 {
        self.reg[index as usize]
    }

    #[inline]
    pub fn set_reg(&mut self, index: u8, val: u32) {
        self.reg[index as usize] = val;
    }

    pub fn registers(&self) -> &[u32; REGISTER_COUNT] {
        &self.reg
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.reg[PC]
    }

    #[inline]
    pub fn set_pc(&mut self, val: u32) {
        self.reg[PC] = val;
    }

    pub fn cpsr(&self) -> u32 {
        self.reg[CPSR]
    }

    pub fn flags(&self) -> Flags {
        Flags::from_cpsr(self.reg[CPSR])
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.reg[CPSR] = flags.apply(self.reg[CPSR]);
    }

    pub fn memory(&self) -> &[u8] {
        &self.mem
    }

    /// Whether a whole word starting at `addr` lies inside memory.
    #[inline]
    pub fn word_in_bounds(addr: u32) -> bool {
        (addr as usize)
            .checked_add(4)
            .is_some_and(|end| end <= MEMORY_SIZE)
    }

    /// Little-endian word at `addr`, or `None` if it would run past the end of memory.
    pub fn read_word(&self, addr: u32) -> Option<u32> {
        if !Self::word_in_bounds(addr) {
            return None;
        }
        let start = addr as usize;
        let bytes = &self.mem[start..start + 4];
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Store `val` little-endian at `addr`. Returns `false` and leaves memory untouched when out
    /// of bounds.
    pub fn write_word(&mut self, addr: u32, val: u32) -> bool {
        if !Self::word_in_bounds(addr) {
            return false;
        }
        let start = addr as usize;
        self.mem[start..start + 4].copy_from_slice(&val.to_le_bytes());
        true
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
