//! ADB Keyboard Simulator
//!
//! Interactive emulator for the Intel MCS-48 (8048/8049) microcontroller
//! used in late-1980s Apple Desktop Bus keyboards. It single-steps the
//! keyboard's mask-ROM firmware and plays the host side of the ADB
//! protocol against it, which makes the firmware's reaction to host
//! commands observable instruction by instruction.
//!
//! # Architecture
//!
//! - `cpu`: MCS-48 instruction interpreter with cycle counting
//! - `ports`: P1/P2/BUS latches and the T0/T1 test lines
//! - `adb`: ADB host state machine, wired to T1 and a port input bit
//! - `disasm`: standalone disassembler for the full instruction set
//! - `emu`: orchestrator keeping CPU and ADB host in lockstep
//!
//! The CPU and the ADB host communicate only through the T1 line and one
//! bit of an input port. The host is ticked from inside T1-sensitive
//! branch opcodes and after every instruction, so all ADB timing is
//! measured in machine cycles (2.5 us each).

pub mod adb;
pub mod cpu;
pub mod disasm;
pub mod ports;

mod emu;

pub use emu::{Emu, EmuError, MAX_ROM_SIZE};
