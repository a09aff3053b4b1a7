//! Cooker command-line protocol.
//!
//! The cooker listens on a single open-collector line for pulse-width coded
//! frames and answers on a second line with frames in the same encoding.
//!
//! ```text
//!  ┌── start ──┐┌────────────── 33 bit slots, 6.4 ms each ─────────────┐
//!  ▔▔▔▔▔▔▔▔▔▔▔▁▁▁▁ ▔▔▔▔▁ ▔▁▁▁▁ ...
//!  25 ms HIGH  10 ms  "1"    "0"
//!              LOW   5120/  1280/
//!                    1280   5120 µs
//! ```
//!
//! Frame layout, MSB first: 16-bit all-ones preamble, 8-bit code, 8-bit
//! complement of the code, one `0` stop bit. Commands carry the power step
//! index (0–5) as the code; feedback carries a status byte.

use core::fmt;

use serde::{Serialize, Serializer};

use crate::error::{CommandError, LineFault};

// ---------------------------------------------------------------------------
// Power levels
// ---------------------------------------------------------------------------

/// The six discrete power steps the cooker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PowerLevel {
    #[default]
    Off,
    P20,
    P40,
    P60,
    P80,
    P100,
}

impl PowerLevel {
    /// Every level in step order.
    pub const ALL: [Self; 6] = [Self::Off, Self::P20, Self::P40, Self::P60, Self::P80, Self::P100];

    pub const fn percent(self) -> u8 {
        self.step() as u8 * 20
    }

    /// Step index 0–5; also the frame code and the indicator slot.
    pub const fn step(self) -> usize {
        self as usize
    }

    pub const fn from_step(step: u8) -> Option<Self> {
        match step {
            0 => Some(Self::Off),
            1 => Some(Self::P20),
            2 => Some(Self::P40),
            3 => Some(Self::P60),
            4 => Some(Self::P80),
            5 => Some(Self::P100),
            _ => None,
        }
    }

    pub const fn is_on(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Command frame for this level.
    pub const fn frame(self) -> Frame {
        COMMAND_FRAMES[self.step()]
    }
}

impl TryFrom<i64> for PowerLevel {
    type Error = CommandError;

    fn try_from(percent: i64) -> Result<Self, CommandError> {
        match percent {
            0 => Ok(Self::Off),
            20 => Ok(Self::P20),
            40 => Ok(Self::P40),
            60 => Ok(Self::P60),
            80 => Ok(Self::P80),
            100 => Ok(Self::P100),
            other => Err(CommandError::InvalidLevel(other)),
        }
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Serialised as the plain percentage.
impl Serialize for PowerLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.percent())
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

pub const FRAME_BITS: u32 = 33;
const PREAMBLE: u64 = 0xFFFF;

/// A 33-bit line frame, bit 32 sent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame(pub u64);

impl Frame {
    pub const fn encode(code: u8) -> Self {
        let check = !code;
        Self((PREAMBLE << 17) | ((code as u64) << 9) | ((check as u64) << 1))
    }

    /// Bit `i` in transmission order (0 = first).
    pub const fn bit(self, i: u32) -> bool {
        (self.0 >> (FRAME_BITS - 1 - i)) & 1 != 0
    }

    /// Validate preamble, check byte and stop bit; return the code.
    pub fn decode(self) -> Result<u8, FrameError> {
        if self.0 >> FRAME_BITS != 0 {
            return Err(FrameError::Length);
        }
        if (self.0 >> 17) & PREAMBLE != PREAMBLE {
            return Err(FrameError::Preamble);
        }
        if self.0 & 1 != 0 {
            return Err(FrameError::StopBit);
        }
        let code = (self.0 >> 9) as u8;
        let check = (self.0 >> 1) as u8;
        if check != !code {
            return Err(FrameError::Check { code, check });
        }
        Ok(code)
    }
}

/// Command frame per power step.
pub const COMMAND_FRAMES: [Frame; 6] = [
    Frame::encode(0),
    Frame::encode(1),
    Frame::encode(2),
    Frame::encode(3),
    Frame::encode(4),
    Frame::encode(5),
];

/// Why a received frame was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A mark matched none of the start/one/zero widths (µs).
    Width(u32),
    /// More than 33 bits.
    Length,
    Preamble,
    StopBit,
    Check { code: u8, check: u8 },
    /// Status byte names a step above 5.
    Level(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Width(us) => write!(f, "unclassifiable mark of {us} µs"),
            Self::Length => write!(f, "frame too long"),
            Self::Preamble => write!(f, "bad preamble"),
            Self::StopBit => write!(f, "bad stop bit"),
            Self::Check { code, check } => {
                write!(f, "check byte 0x{check:02X} does not match code 0x{code:02X}")
            }
            Self::Level(step) => write!(f, "unknown power step {step}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pulse timing
// ---------------------------------------------------------------------------

pub const START_MARK_US: u32 = 25_000;
pub const START_SPACE_US: u32 = 10_000;
pub const LONG_US: u32 = 5_120;
pub const SHORT_US: u32 = 1_280;

/// Every bit slot is one long and one short pulse, so all frames take
/// the same time on the line.
pub const FRAME_US: u32 = START_MARK_US + START_SPACE_US + FRAME_BITS * (LONG_US + SHORT_US);

pub const START_TOLERANCE_US: u32 = 10_000;
pub const ONE_TOLERANCE_US: u32 = 1_500;
pub const ZERO_TOLERANCE_US: u32 = 500;

/// One level held for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub high: bool,
    pub duration_us: u32,
}

/// Steps through the pulses of one frame: start mark, start space, then a
/// mark/space pair per bit. The line is left LOW after the last space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTrain {
    frame: Frame,
    index: u32,
}

impl PulseTrain {
    /// Total pulses in a frame.
    pub const LEN: u32 = 2 + 2 * FRAME_BITS;

    pub const fn new(frame: Frame) -> Self {
        Self { frame, index: 0 }
    }

    /// Total on-air time of a frame (µs).
    pub fn duration_us(frame: Frame) -> u32 {
        Self::new(frame).map(|p| p.duration_us).sum()
    }
}

impl Iterator for PulseTrain {
    type Item = Pulse;

    fn next(&mut self) -> Option<Pulse> {
        let i = self.index;
        if i >= Self::LEN {
            return None;
        }
        self.index += 1;
        let pulse = match i {
            0 => Pulse { high: true, duration_us: START_MARK_US },
            1 => Pulse { high: false, duration_us: START_SPACE_US },
            _ => {
                let bit = self.frame.bit((i - 2) / 2);
                let mark = (i - 2) % 2 == 0;
                let duration_us = if bit == mark { LONG_US } else { SHORT_US };
                Pulse { high: mark, duration_us }
            }
        };
        Some(pulse)
    }
}

// ---------------------------------------------------------------------------
// Feedback status
// ---------------------------------------------------------------------------

/// What the cooker says about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackReport {
    pub level: PowerLevel,
    pub fault: Option<LineFault>,
}

const STATUS_LEVEL_MASK: u8 = 0x07;
const STATUS_FAULT_FLAG: u8 = 0x80;
const STATUS_CODE_SHIFT: u8 = 4;

impl FeedbackReport {
    /// Status byte: bits 0–2 step, bits 4–6 fault code, bit 7 fault flag.
    pub fn from_status(status: u8) -> Result<Self, FrameError> {
        let step = status & STATUS_LEVEL_MASK;
        let level = PowerLevel::from_step(step).ok_or(FrameError::Level(step))?;
        let fault = (status & STATUS_FAULT_FLAG != 0).then_some(LineFault {
            code: (status >> STATUS_CODE_SHIFT) & 0x07,
        });
        Ok(Self { level, fault })
    }

    pub fn status_byte(&self) -> u8 {
        let mut status = self.level.step() as u8;
        if let Some(f) = self.fault {
            status |= STATUS_FAULT_FLAG | ((f.code & 0x07) << STATUS_CODE_SHIFT);
        }
        status
    }
}
