//! MCS-48 CPU tests
//!
//! Organized into:
//! - instructions.rs: ALU, register, port, and data-movement behavior
//! - control_flow.rs: jumps, calls, the return stack, and cycle counting
//!
//! # References
//! - Intel MCS-48 Family User's Manual

use super::*;
use crate::adb::AdbHost;

mod instructions;

// ========== Test Helpers ==========

/// CPU with the given firmware loaded, plus an idle ADB host to step with
fn with_rom(rom: &[u8]) -> (Cpu, AdbHost) {
    let mut cpu = Cpu::new();
    cpu.load_rom(rom);
    (cpu, AdbHost::new())
}

/// Run `steps` instructions of the given firmware and return the CPU
fn run_steps(rom: &[u8], steps: usize) -> Cpu {
    let (mut cpu, mut adb) = with_rom(rom);
    for _ in 0..steps {
        cpu.step(&mut adb);
    }
    cpu
}
