//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensor hub, cooker line, bus publisher, clock) implement
//! these traits. The [`AppService`](super::service::AppService) consumes them
//! via generics, so the domain core never touches hardware directly.

use crate::control::feedback::EdgeBuffer;
use crate::control::protocol::{Frame, PowerLevel};
use crate::error::PublishError;
use crate::scheduler::TaskId;
use crate::sensors::SensorReading;

// ───────────────────────────────────────────────────────────────
// Temperature port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to refresh every sensor slot.
pub trait TemperaturePort {
    /// Poll every sensor once and return the latest reading per slot.
    /// Must not block on a one-wire conversion.
    fn poll_all(&mut self, now_ms: u64) -> &[SensorReading];
}

// ───────────────────────────────────────────────────────────────
// Induction port (driven adapter: domain ↔ cooker)
// ───────────────────────────────────────────────────────────────

/// A previous frame is still on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxBusy;

/// Outputs and lines of the induction cooker.
pub trait InductionPort {
    /// Energise or release the cooker/fan relay.
    fn set_relay(&mut self, on: bool);

    /// Drive one level indicator.
    fn set_indicator(&mut self, level: PowerLevel, on: bool);

    /// Start sending a frame on the command line without waiting for it.
    fn transmit(&mut self, frame: Frame) -> Result<(), TxBusy>;

    /// Move captured feedback edges into `out`. Returns `true` if edges
    /// were lost since the previous call.
    fn drain_feedback(&mut self, out: &mut EdgeBuffer) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Publish port (driven adapter: domain → message bus)
// ───────────────────────────────────────────────────────────────

/// Hands a telemetry message to the bus. Must never block.
pub trait PublishPort {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the tasks)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes once per due task.
///
/// The [`Scheduler`](crate::scheduler::Scheduler) only keeps time; the
/// main loop implements this to run the matching service operation.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, task: TaskId, now_ms: u64);
}
