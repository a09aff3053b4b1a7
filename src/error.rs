//! Unified error types for the brewing station firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! scheduler's task isolation uniform: a task returns `Result<()>`, the
//! loop logs the error and moves on. All variants are `Copy` so they can
//! be latched into controller state and telemetry without allocation.

use core::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A temperature sensor could not be read or returned implausible data.
    Sensor(SensorFault),
    /// An inbound command was rejected.
    Command(CommandError),
    /// Telemetry could not be handed to the message bus.
    Publish(PublishError),
    /// Configuration is invalid.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Why a [`SensorReading`](crate::sensors::SensorReading) is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFault {
    /// No reading has been acquired yet.
    NoData,
    /// Device absent, no presence pulse, or the disconnect sentinel.
    Disconnected,
    /// Scratchpad CRC-8 did not match.
    CrcMismatch,
    /// Value outside the physically plausible range.
    OutOfRange,
    /// Conversion result did not arrive in time.
    Timeout,
    /// RTD converter fault status register (raw bits).
    RtdFault(u8),
    /// Pin or SPI transfer error at the I/O layer.
    BusError,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data yet"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::CrcMismatch => write!(f, "CRC mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::Timeout => write!(f, "conversion timeout"),
            Self::RtdFault(bits) => write!(f, "RTD fault status 0x{bits:02X}"),
            Self::BusError => write!(f, "bus I/O error"),
        }
    }
}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Power level outside {0, 20, 40, 60, 80, 100}.
    InvalidLevel(i64),
    /// Payload could not be parsed at all.
    Malformed,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLevel(v) => write!(f, "invalid power level {v}"),
            Self::Malformed => write!(f, "malformed payload"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Outbound queue full or bus client not connected.
    Unavailable,
    /// Topic or payload exceeds the fixed message buffers.
    TooLarge,
    /// Snapshot could not be serialised.
    Encode,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "bus unavailable"),
            Self::TooLarge => write!(f, "message too large"),
            Self::Encode => write!(f, "encode failed"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Cooker line faults
// ---------------------------------------------------------------------------

/// Fault reported by the cooker in a feedback frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineFault {
    /// Cooker-specific fault code (3 bits).
    pub code: u8,
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cooker fault code {}", self.code)
    }
}

// ---------------------------------------------------------------------------
// Telemetry fault bitmask
// ---------------------------------------------------------------------------

/// Conditions summarised in the `faults` field of every status snapshot.
/// Several can be active at once, so they are combined as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemFault {
    /// The cooker reported a fault since the last accepted command.
    CookerLine = 0b0000_0001,
    /// At least one temperature reading is invalid.
    Sensor = 0b0000_0010,
    /// The previous telemetry publish was dropped.
    PublishDropped = 0b0000_0100,
}

impl SystemFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SystemFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CookerLine => write!(f, "cooker line fault"),
            Self::Sensor => write!(f, "sensor fault"),
            Self::PublishDropped => write!(f, "publish dropped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
