//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (bus topic,
//! serial console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.

use crate::bus::payload::parse_power_command;
use crate::error::CommandError;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Set the induction power level, in percent. Validated by the
    /// controller against the six discrete steps.
    SetPower(i64),
}

impl AppCommand {
    /// Parse a heater command payload. Malformed payloads are rejected
    /// here; out-of-range levels are rejected by the controller.
    pub fn from_payload(payload: &str) -> Result<Self, CommandError> {
        parse_power_command(payload).map(Self::SetPower)
    }
}
