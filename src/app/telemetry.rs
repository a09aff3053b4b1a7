//! Outbound telemetry records.
//!
//! A [`StatusSnapshot`] is assembled on every status period from the latest
//! sensor slots and the induction controller state, serialised to JSON and
//! handed to the [`PublishPort`](super::ports::PublishPort).
//!
//! ```json
//! {
//!   "uptime_ms": 600,
//!   "sensors": [
//!     {"id":"28010000000000BE","kind":"one_wire","raw":400,
//!      "temperature_c":25.0,"timestamp_ms":600,"valid":true,"fault":null}
//!   ],
//!   "induction": {"requested":40,"actual":40,"relay":true,"fan":true,
//!                 "cooldown_remaining_ms":0,"line_fault":null,
//!                 "last_command_ms":120},
//!   "faults": 0
//! }
//! ```

use serde::Serialize;

use crate::control::induction::InductionStatus;
use crate::sensors::SensorReading;

/// Everything the station reports once per status period.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot<'a> {
    pub uptime_ms: u64,
    pub sensors: &'a [SensorReading],
    pub induction: InductionStatus,
    /// [`SystemFault`](crate::error::SystemFault) bitmask.
    pub faults: u8,
}
