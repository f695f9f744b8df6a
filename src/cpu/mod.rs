//! MCS-48 (8048/8049) CPU core
//!
//! Interprets the mask-ROM firmware of the keyboard controller one
//! instruction at a time. One machine cycle is roughly 2.5 us; most
//! instructions take one cycle, immediate and control-flow forms take two.
//!
//! # Module Organization
//!
//! - `flags`: PSW bit constants
//! - `helpers`: register-bank access, stack frames, ALU and branch helpers
//! - `execute`: opcode dispatch
//!
//! # On-chip RAM layout (8049, 128 bytes)
//!
//! | Range       | Use                              |
//! |-------------|----------------------------------|
//! | 0x00 - 0x07 | register bank 0 (R0-R7)          |
//! | 0x08 - 0x17 | return stack, 8 two-byte slots   |
//! | 0x18 - 0x1F | register bank 1 (R0-R7)          |
//! | 0x20 - 0x7F | scratch                          |
//!
//! The register banks and the stack alias RAM, so `dump_ram` shows calls
//! and register writes exactly where the firmware put them.
//!
//! # References
//! - Intel MCS-48 Family User's Manual

use std::fmt::Write as _;

use log::warn;

use crate::adb::AdbHost;
use crate::ports::Ports;

mod execute;
pub mod flags;
mod helpers;

#[cfg(test)]
mod tests;

/// Default ROM size when no image is loaded (8049 mask ROM)
pub const DEFAULT_ROM_SIZE: usize = 2048;
/// On-chip RAM size (8049)
pub const RAM_SIZE: usize = 128;

/// MCS-48 CPU state
pub struct Cpu {
    /// Program counter, 12 bits used
    pub pc: u16,
    /// Accumulator
    pub acc: u8,
    /// Program status word: carry, flags, bank select, 3-bit stack pointer
    pub psw: u8,
    /// Active register bank (0 or 1), mirrors PSW bit 4
    pub rb: u8,
    /// Memory bank select, tracked but not used for addressing
    pub mb: u8,
    /// User flag F0
    pub f0: bool,
    /// User flag F1
    pub f1: bool,
    /// Timer/counter data register (counting is not modeled)
    pub t: u8,
    /// Timer interrupt enable, tracked only
    pub tie: bool,
    /// External interrupt enable, tracked only
    pub eie: bool,
    /// External interrupt line level, true = inactive
    pub irq: bool,
    /// Machine cycles executed so far
    pub cycles: u64,
    /// Ports P1/P2, BUS, and the T0/T1 test lines
    pub ports: Ports,

    /// Firmware image
    rom: Vec<u8>,
    /// Authoritative ROM size for PC bounds checks
    rom_size: usize,
    /// On-chip RAM, aliased by register banks and the return stack
    ram: Vec<u8>,
}

impl Cpu {
    /// Create a CPU in reset state with no firmware loaded
    pub fn new() -> Self {
        Self {
            pc: 0,
            acc: 0,
            psw: flags::RESERVED,
            rb: 0,
            mb: 0,
            f0: false,
            f1: false,
            t: 0,
            tie: false,
            eie: false,
            irq: true,
            cycles: 0,
            ports: Ports::new(),
            rom: Vec::new(),
            rom_size: DEFAULT_ROM_SIZE,
            ram: vec![0; RAM_SIZE],
        }
    }

    /// Reset the CPU. RAM contents survive; the mask ROM chip does not
    /// clear RAM on reset.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.acc = 0;
        self.psw = flags::RESERVED;
        self.rb = 0;
        self.mb = 0;
        self.f0 = false;
        self.f1 = false;
        self.t = 0;
        self.tie = false;
        self.eie = false;
        self.irq = true;
        self.cycles = 0;
        self.ports.reset();
    }

    /// Install a firmware image. Its length becomes the authoritative
    /// `rom_size` used by PC bounds checks.
    pub fn load_rom(&mut self, data: &[u8]) {
        self.rom = data.to_vec();
        self.rom_size = data.len();
    }

    /// Authoritative ROM size
    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    /// Read a ROM byte. Reads past the image yield 0x00; execution past
    /// `rom_size` is undefined but must not abort the process.
    #[inline]
    pub fn rom_byte(&self, addr: u16) -> u8 {
        self.rom.get(addr as usize).copied().unwrap_or(0)
    }

    /// On-chip RAM, for dumps and tests
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Current program counter
    pub fn get_pc(&self) -> u16 {
        self.pc
    }

    /// Read register `n` of the active bank
    pub fn get_reg(&self, n: u8) -> u8 {
        self.reg(n)
    }

    /// Execute one instruction. T1-sensitive opcodes tick the ADB host
    /// before sampling the line, and the host is ticked once more after the
    /// instruction so its timing stays in the CPU cycle domain.
    pub fn step(&mut self, adb: &mut AdbHost) {
        let opcode = self.rom_byte(self.pc);
        // every instruction is at least one byte and one cycle
        self.pc += 1;
        self.cycles += 1;
        self.execute(opcode, adb);
        adb.tick(self.cycles, &mut self.ports);
    }

    /// Step until PC equals `addr`. Equality is the sole termination
    /// condition; an address the firmware never reaches will loop forever.
    pub fn run_until(&mut self, addr: u16, adb: &mut AdbHost) {
        while self.pc != addr {
            self.step(adb);
        }
    }

    /// Mutate a named piece of state from the REPL. Out-of-range values and
    /// unknown destinations are logged and ignored.
    pub fn set_state(&mut self, dst: &str, val: i64) {
        match dst {
            "PC" => {
                if val < 0 || val > self.rom_size as i64 {
                    warn!("invalid value {:#06X}", val);
                } else {
                    self.pc = val as u16;
                }
            }
            "A" => {
                if !(0..=255).contains(&val) {
                    warn!("invalid value {:#06X}", val);
                } else {
                    self.acc = val as u8;
                }
            }
            "T0" => self.ports.t0 = val & 1 != 0,
            "T1" => self.ports.t1 = val & 1 != 0,
            _ => {
                if let Some(n) = dst.strip_prefix('R').and_then(|r| r.parse::<u8>().ok()) {
                    if n > 7 {
                        warn!("invalid register {}", n);
                    } else if !(0..=255).contains(&val) {
                        warn!("invalid value {:#06X}", val);
                    } else {
                        self.set_reg(n, val as u8);
                    }
                } else {
                    warn!("unknown destination {}", dst);
                }
            }
        }
    }

    /// Render the register file and core state as text
    pub fn print_state(&self) -> String {
        let mut out = String::new();
        out.push_str("Register bank 0:\n");
        for i in 0..8 {
            let _ = writeln!(out, "r{}: {:#04X}", i, self.ram[i]);
        }
        out.push_str("\nRegister bank 1:\n");
        for i in 0..8 {
            let _ = writeln!(out, "r{}: {:#04X}", i, self.ram[i + 24]);
        }
        let _ = writeln!(out, "\nPC : {:#05X}", self.pc);
        let _ = writeln!(out, "ACC: {:#04X}", self.acc);
        let _ = writeln!(out, "PSW: {:#04X}", self.psw);
        let _ = writeln!(out, "Reg bank: {}", self.rb);
        let _ = writeln!(out, "Mem bank: {}", self.mb);
        let _ = writeln!(out, "F0: {}", self.f0 as u8);
        let _ = writeln!(out, "F1: {}", self.f1 as u8);
        let _ = writeln!(out, "T0: {}  T1: {}", self.ports.t0 as u8, self.ports.t1 as u8);
        let _ = writeln!(out, "Cycles: {}", self.cycles);
        out
    }

    /// Render on-chip RAM as a 16-byte-per-row hex dump
    pub fn dump_ram(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.ram.chunks(16).enumerate() {
            let _ = write!(out, "{:04X}  ", row * 16);
            for byte in chunk {
                let _ = write!(out, "{:02X} ", byte);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
