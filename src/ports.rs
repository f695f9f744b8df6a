//! I/O ports and test lines
//!
//! The 8048/8049 exposes two quasi-bidirectional ports (P1, P2), the BUS
//! pseudo-port, and two single-bit test inputs (T0, T1). Port writes latch
//! the value and are announced so an external observer can watch firmware
//! toggling pins; T1 doubles as the ADB data line and is also driven by the
//! ADB host.

use log::{info, warn};

/// Port number of the BUS pseudo-port in `write_port`
pub const PORT_BUS: u8 = 0;
/// Port number of P1
pub const PORT_P1: u8 = 1;
/// Port number of P2
pub const PORT_P2: u8 = 2;

/// Observer invoked after every latched port write
pub type WriteHook = Box<dyn FnMut(u8, u8)>;

/// Latched port state and test lines
pub struct Ports {
    /// Port 1 latch
    pub p1: u8,
    /// Port 2 latch
    pub p2: u8,
    /// BUS latch, 0xFF when floating
    pub bus: u8,
    /// Test input 0
    pub t0: bool,
    /// Test input 1, carries the ADB line
    pub t1: bool,
    /// Optional write observer
    hook: Option<WriteHook>,
}

impl Ports {
    /// Create the port block in its power-on state (test lines pulled high)
    pub fn new() -> Self {
        Self {
            p1: 0x00,
            p2: 0xFF,
            bus: 0xFF,
            t0: true,
            t1: true,
            hook: None,
        }
    }

    /// Reset the latches. The test lines keep their current levels; they are
    /// inputs, not state the chip owns.
    pub fn reset(&mut self) {
        self.p1 = 0x00;
        self.p2 = 0xFF;
        self.bus = 0xFF;
    }

    /// Latch `val` into the numbered port and notify observers.
    /// Unknown port numbers are logged and ignored.
    pub fn write_port(&mut self, port: u8, val: u8) {
        match port {
            PORT_BUS => self.bus = val,
            PORT_P1 => self.p1 = val,
            PORT_P2 => self.p2 = val,
            _ => {
                warn!("write to unsupported port {}", port);
                return;
            }
        }
        info!("port {} state changed to {:#04X}", port, val);
        if let Some(hook) = self.hook.as_mut() {
            hook(port, val);
        }
    }

    /// Read the numbered port latch. Unknown ports read as 0xFF.
    pub fn read_port(&self, port: u8) -> u8 {
        match port {
            PORT_BUS => self.bus,
            PORT_P1 => self.p1,
            PORT_P2 => self.p2,
            _ => {
                warn!("read from unsupported port {}", port);
                0xFF
            }
        }
    }

    /// Install an observer for latched writes
    pub fn set_write_hook(&mut self, hook: WriteHook) {
        self.hook = Some(hook);
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}
