//! ADB host bus emulation
//!
//! Plays the host side of the Apple Desktop Bus against the keyboard
//! firmware under test. The host drives T1 through the
//! Attention/Sync/command/Stop/Tlt phases of a transaction, then decodes
//! the device's answer by timing the low and high sub-phases of each bit
//! cell. All timing is measured in CPU machine cycles (2.5 us each), so the
//! host must be ticked from the CPU's own step loop: T1-sensitive branch
//! opcodes tick it before sampling the line, and every instruction ticks it
//! once more afterwards. A single tick performs at most one state
//! transition.
//!
//! Bits on the wire are pulse-width coded: a short low phase (~35 us of a
//! 100 us cell) is a "1", a long low phase (~65 us) is a "0".

use log::{debug, info, warn};

use crate::ports::Ports;

// Phase durations in machine cycles (2.5 us each)

/// Attention pulse, T1 held low (~800 us)
const ATTENTION_CYCLES: u64 = 320;
/// Sync gap, T1 released high (~70 us)
const SYNC_CYCLES: u64 = 28;
/// Command bit cell width (~100 us)
const CELL_CYCLES: u64 = 40;
/// Low phase of a transmitted "1" bit (~35 us)
const ONE_LOW_CYCLES: u64 = 14;
/// Low phase of a transmitted "0" bit (~65 us)
const ZERO_LOW_CYCLES: u64 = 26;
/// Stop bit low phase (~70 us)
const STOP_LOW_CYCLES: u64 = 28;
/// Tlt turnaround window (~145 us)
const TLT_CYCLES: u64 = 58;
/// How long to wait for the device's start bit (~115 us)
const START_TIMEOUT_CYCLES: u64 = 46;
/// A received bit cell longer than this (~130 us) is a timing violation
const CELL_TIMEOUT_CYCLES: u64 = 52;
/// Minimum cell time before a high-to-low edge may end it
const EDGE_MIN_CYCLES: u64 = 15;
/// Received low phase above this (~35 us) classifies the bit as "0"
const ZERO_THRESHOLD_CYCLES: u64 = 14;

/// Where the bit-cell receiver delivers its bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxTarget {
    CheckStart,
    RxData,
    RxStop,
}

/// Sub-phase of the bit cell currently being received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Low,
    High,
}

/// ADB host protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdbState {
    /// No transaction in progress
    Idle,
    /// Armed by `send`, transaction begins on the next tick
    Start,
    /// T1 held low for the attention pulse
    Attention,
    /// T1 released for the sync gap
    Sync,
    /// Shifting the command byte out, MSB first
    SendCmd,
    /// Stop bit after the command byte
    Stop,
    /// Turnaround; a device holding T1 low here is a service request
    Tlt,
    /// Dispatch on the command class (Talk/Listen)
    DataInit,
    /// Waiting for the device's start bit
    WaitStart,
    /// Receiving one bit cell; `next` is the continuation once the cell
    /// closes on its high-to-low edge
    RxBit {
        next: RxTarget,
        phase: Phase,
        low_time: u64,
        high_time: u64,
    },
    /// Validate the start bit
    CheckStart,
    /// Assemble received data bits into bytes
    RxData,
    /// Validate the stop bit and finish
    RxStop,
}

/// Samples the device side of the ADB line from the port block.
/// Must be free of side effects; it can run several times per cycle.
pub type InputSampler = Box<dyn Fn(&Ports) -> u8>;

/// ADB host state machine
pub struct AdbHost {
    /// Current protocol state
    pub state: AdbState,
    /// Command byte latched by `send`
    pub cmd: u8,
    /// TX bit index counting down from 7, or the last received bit
    pub bit: i8,
    /// RX bit position within the byte being assembled
    pub bit_pos: u8,
    /// RX byte being assembled
    pub byte: u8,
    /// Received payload bytes, retained after aborts for inspection
    pub data: Vec<u8>,
    /// Cycle at which the current phase began
    cyc_cnt: u64,
    /// Device-side line sampler
    sampler: InputSampler,
    /// Mask selecting the data bit in the sampled byte
    in_mask: u8,
}

impl AdbHost {
    /// Create an idle host. The device side is sampled from P1 bit 7
    /// until `set_input_line` overrides it.
    pub fn new() -> Self {
        Self {
            state: AdbState::Idle,
            cmd: 0,
            bit: 0,
            bit_pos: 0,
            byte: 0,
            data: Vec::new(),
            cyc_cnt: 0,
            sampler: Box::new(|ports| ports.p1),
            in_mask: 0x80,
        }
    }

    /// Arm a transaction with the given command byte. Any transaction in
    /// flight restarts; previously received data is discarded.
    pub fn send(&mut self, cmd: u8) {
        info!("sending ADB command {:#04X}", cmd);
        self.cmd = cmd;
        self.data.clear();
        self.state = AdbState::Start;
    }

    /// Install the device-side line sampler and its bit mask
    pub fn set_input_line(&mut self, sampler: InputSampler, mask: u8) {
        self.sampler = sampler;
        self.in_mask = mask;
    }

    /// Sample the device side of the line; true means the device is
    /// asserting (pulling the bus low)
    fn read_in(&self, ports: &Ports) -> bool {
        (self.sampler)(ports) & self.in_mask != 0
    }

    /// Advance the state machine. `cycles` is the CPU cycle counter; at
    /// most one state transition happens per call.
    pub fn tick(&mut self, cycles: u64, ports: &mut Ports) {
        let elapsed = cycles.wrapping_sub(self.cyc_cnt);
        match self.state {
            AdbState::Idle => {}

            AdbState::Start => {
                info!("ADB transaction start");
                self.cyc_cnt = cycles;
                ports.t1 = false;
                self.state = AdbState::Attention;
            }

            AdbState::Attention => {
                if elapsed >= ATTENTION_CYCLES {
                    info!("ADB attention ended");
                    self.cyc_cnt = cycles;
                    ports.t1 = true;
                    self.state = AdbState::Sync;
                }
            }

            AdbState::Sync => {
                if elapsed >= SYNC_CYCLES {
                    info!("ADB sync ended");
                    self.bit = 7;
                    self.cyc_cnt = cycles;
                    ports.t1 = false;
                    self.state = AdbState::SendCmd;
                }
            }

            AdbState::SendCmd => {
                if self.bit >= 0 {
                    if elapsed < CELL_CYCLES {
                        // release point inside the cell encodes the bit
                        let release_at = if self.cmd & (1 << self.bit) != 0 {
                            ONE_LOW_CYCLES
                        } else {
                            ZERO_LOW_CYCLES
                        };
                        if elapsed >= release_at {
                            ports.t1 = true;
                        }
                    } else {
                        debug!("sending next ADB bit");
                        ports.t1 = false;
                        self.bit -= 1;
                        if self.bit < 0 {
                            info!("ADB command byte sent, sending stop bit");
                            self.state = AdbState::Stop;
                        }
                        self.cyc_cnt = cycles;
                    }
                } else {
                    warn!("ADB command byte already completed");
                    self.state = AdbState::Idle;
                }
            }

            AdbState::Stop => {
                if elapsed >= STOP_LOW_CYCLES {
                    ports.t1 = true;
                    info!("ADB stop bit completed");
                    self.cyc_cnt = cycles;
                    self.state = AdbState::Tlt;
                }
            }

            AdbState::Tlt => {
                if !ports.t1 {
                    info!("service request during Tlt");
                } else if elapsed >= TLT_CYCLES {
                    info!("ADB Tlt completed");
                    self.cyc_cnt = cycles;
                    self.state = AdbState::DataInit;
                }
            }

            AdbState::DataInit => match self.cmd & 0x0C {
                0x0C => {
                    info!("ADB talk started");
                    self.cyc_cnt = cycles;
                    self.state = AdbState::WaitStart;
                }
                0x08 => {
                    warn!("ADB listen not supported");
                    self.state = AdbState::Idle;
                }
                _ => {
                    warn!("unsupported ADB command {:#04X}", self.cmd);
                    self.state = AdbState::Idle;
                }
            },

            AdbState::WaitStart => {
                ports.t1 = !self.read_in(ports);
                if ports.t1 {
                    if elapsed >= START_TIMEOUT_CYCLES {
                        warn!("ADB start bit timeout");
                        self.state = AdbState::Idle;
                    }
                } else {
                    debug!("checking ADB start bit");
                    self.cyc_cnt = cycles;
                    self.state = AdbState::RxBit {
                        next: RxTarget::CheckStart,
                        phase: Phase::Low,
                        low_time: 0,
                        high_time: 0,
                    };
                }
            }

            AdbState::RxBit {
                next,
                phase,
                low_time,
                ..
            } => self.rx_bit(cycles, ports, next, phase, low_time),

            AdbState::CheckStart => {
                if self.bit == 0 {
                    warn!("invalid ADB start bit, aborting");
                    self.state = AdbState::Idle;
                } else {
                    self.bit_pos = 0;
                    self.byte = 0;
                    self.state = AdbState::RxBit {
                        next: RxTarget::RxData,
                        phase: Phase::Low,
                        low_time: 0,
                        high_time: 0,
                    };
                }
            }

            AdbState::RxData => {
                self.byte = (self.byte << 1) | self.bit as u8;
                if self.bit_pos < 7 {
                    self.bit_pos += 1;
                    self.state = AdbState::RxBit {
                        next: RxTarget::RxData,
                        phase: Phase::Low,
                        low_time: 0,
                        high_time: 0,
                    };
                } else {
                    info!("got ADB byte {:#04X} from device", self.byte);
                    self.data.push(self.byte);
                    if self.data.len() < 2 {
                        self.bit_pos = 0;
                        self.byte = 0;
                        self.state = AdbState::RxBit {
                            next: RxTarget::RxData,
                            phase: Phase::Low,
                            low_time: 0,
                            high_time: 0,
                        };
                    } else {
                        self.cyc_cnt = cycles;
                        self.state = AdbState::RxBit {
                            next: RxTarget::RxStop,
                            phase: Phase::Low,
                            low_time: 0,
                            high_time: 0,
                        };
                    }
                }
            }

            AdbState::RxStop => {
                if self.bit == 1 {
                    info!("received ADB stop bit");
                } else {
                    warn!("invalid ADB stop bit");
                }
                self.state = AdbState::Idle;
            }
        }
    }

    /// Receive one bit cell. The device's line level is mirrored onto T1
    /// inverted; the cell closes on the high-to-low edge, and the length of
    /// its low phase classifies the bit.
    fn rx_bit(&mut self, cycles: u64, ports: &mut Ports, next: RxTarget, phase: Phase, low_time: u64) {
        ports.t1 = !self.read_in(ports);
        let elapsed = cycles.wrapping_sub(self.cyc_cnt);
        if !ports.t1 {
            match phase {
                Phase::High => {
                    // the cell must not close before the minimum edge time
                    if elapsed < EDGE_MIN_CYCLES {
                        warn!("ADB timing error, high-to-low edge too early");
                        self.state = AdbState::Idle;
                    } else {
                        let high_time = elapsed - low_time;
                        self.bit = if low_time > ZERO_THRESHOLD_CYCLES { 0 } else { 1 };
                        debug!(
                            "got {} bit from ADB device (low {:.1} us, high {:.1} us)",
                            self.bit,
                            low_time as f64 * 2.5,
                            high_time as f64 * 2.5,
                        );
                        self.cyc_cnt = cycles;
                        self.state = match next {
                            RxTarget::CheckStart => AdbState::CheckStart,
                            RxTarget::RxData => AdbState::RxData,
                            RxTarget::RxStop => AdbState::RxStop,
                        };
                    }
                }
                Phase::Low => {
                    if elapsed > CELL_TIMEOUT_CYCLES {
                        warn!("ADB bit cell timeout, low phase over 130 us");
                        self.state = AdbState::Idle;
                    } else {
                        self.state = AdbState::RxBit {
                            next,
                            phase: Phase::Low,
                            low_time: elapsed,
                            high_time: 0,
                        };
                    }
                }
            }
        } else {
            let low_time = if phase == Phase::Low {
                debug!("ADB line changed from low to high");
                elapsed
            } else {
                low_time
            };
            if elapsed > CELL_TIMEOUT_CYCLES {
                warn!("ADB bit cell timeout, cell over 130 us");
                self.state = AdbState::Idle;
            } else {
                self.state = AdbState::RxBit {
                    next,
                    phase: Phase::High,
                    low_time,
                    high_time: elapsed - low_time,
                };
            }
        }
    }
}

impl Default for AdbHost {
    fn default() -> Self {
        Self::new()
    }
}
