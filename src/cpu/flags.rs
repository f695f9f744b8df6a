//! MCS-48 PSW bit definitions
//!
//! Bit positions in the program status word. The low three bits are the
//! stack pointer into the on-chip return stack (RAM 0x08-0x17), not flags.
//! Bit 6 is the auxiliary carry, which this core does not model, and bit 5
//! is user flag F0, whose working copy lives in `Cpu::f0`; neither gets a
//! constant here.
//!
//! # References
//! - Intel MCS-48 Family User's Manual

/// Carry flag (bit 7)
pub const CY: u8 = 0b1000_0000;
/// Register bank select (bit 4) - mirrors `Cpu::rb`
pub const BS: u8 = 0b0001_0000;
/// Reserved bit (bit 3) - always reads as 1
pub const RESERVED: u8 = 0b0000_1000;
/// Stack pointer field (bits 2-0)
pub const SP_MASK: u8 = 0b0000_0111;
