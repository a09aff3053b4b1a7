//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the induction controller, the latest sensor slots
//! and the telemetry bookkeeping. It exposes one operation per scheduled
//! task plus command handling. All I/O flows through port traits injected
//! at call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  TemperaturePort ──▶ ┌─────────────────────────┐ ──▶ PublishPort
//!                      │       AppService        │
//!    InductionPort ◀──▶│ induction · telemetry   │
//!                      └─────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, info, warn};

use crate::bus::channels::{InboundCommand, Payload};
use crate::bus::payload::encode_json;
use crate::bus::topics::Topics;
use crate::config::SystemConfig;
use crate::control::induction::{InductionController, InductionStatus};
use crate::control::protocol::PowerLevel;
use crate::error::{Result, SensorFault, SystemFault};
use crate::scheduler::TaskId;
use crate::sensors::{MAX_READINGS, SensorReading};

use super::commands::AppCommand;
use super::ports::{InductionPort, PublishPort, SchedulerDelegate, TemperaturePort};
use super::telemetry::StatusSnapshot;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: SystemConfig,
    topics: Topics,
    induction: InductionController,
    /// Copy of the hub's slots from the last acquisition.
    readings: Vec<SensorReading, MAX_READINGS>,
    publish_dropped: bool,
    published: u64,
    dropped: u64,
}

impl AppService {
    /// Construct the service from a validated configuration.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        let topics = Topics::from_config(&config.topics)?;
        let induction = InductionController::new(&config.induction);
        info!("app: publishing to '{}', commands on '{}'", topics.status, topics.heater_command);
        Ok(Self {
            config,
            topics,
            induction,
            readings: Vec::new(),
            publish_dropped: false,
            published: 0,
            dropped: 0,
        })
    }

    // ── Scheduled tasks ───────────────────────────────────────

    /// Refresh every sensor slot. Returns how many readings are valid.
    ///
    /// Faults are logged when a slot changes state, not on every poll.
    pub fn read_temperatures(&mut self, now_ms: u64, hw: &mut impl TemperaturePort) -> usize {
        let fresh = hw.poll_all(now_ms);

        for r in fresh {
            let before = self.readings.iter().find(|p| p.id == r.id).map(|p| p.fault);
            if before == Some(r.fault) {
                continue;
            }
            match r.fault {
                // Slots start as NoData until the first conversion lands.
                Some(SensorFault::NoData) => {}
                Some(f) => warn!("sensors: {} invalid: {}", r.id, f),
                None => info!("sensors: {} reading {:.2} °C", r.id, r.temperature_c),
            }
        }

        self.readings.clear();
        for r in fresh.iter().take(MAX_READINGS) {
            let _ = self.readings.push(r.clone());
        }
        self.readings.iter().filter(|r| r.valid).count()
    }

    /// Run one induction control tick.
    pub fn update_induction(&mut self, now_ms: u64, hw: &mut impl InductionPort) {
        self.induction.tick(now_ms, hw);
    }

    /// Publish the full snapshot and the heater record.
    ///
    /// Never blocks: a full bus queue is reported as an error, counted,
    /// and flagged in the next snapshot.
    pub fn send_status(&mut self, now_ms: u64, publisher: &mut impl PublishPort) -> Result<()> {
        let result = self.try_publish(now_ms, publisher);
        match result {
            Ok(()) => {
                if self.publish_dropped {
                    info!("app: telemetry publishing recovered");
                }
                self.publish_dropped = false;
                self.published += 1;
            }
            Err(e) => {
                warn!("app: telemetry dropped: {}", e);
                self.publish_dropped = true;
                self.dropped += 1;
            }
        }
        result
    }

    fn try_publish(&self, now_ms: u64, publisher: &mut impl PublishPort) -> Result<()> {
        let snapshot = self.build_status_snapshot(now_ms);
        let status: Payload = encode_json(&snapshot)?;
        publisher.publish(&self.topics.status, &status)?;

        let heater: Payload = encode_json(&snapshot.induction)?;
        publisher.publish(&self.topics.heater_status, &heater)?;
        debug!("app: status published ({} bytes)", status.len());
        Ok(())
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut impl InductionPort,
    ) -> Result<PowerLevel> {
        match cmd {
            AppCommand::SetPower(percent) => Ok(self.induction.set_power(percent, now_ms, hw)?),
        }
    }

    /// Handle a message from the bus. Messages on other topics are
    /// ignored (`Ok(None)`); malformed or invalid commands leave the
    /// controller untouched.
    pub fn handle_inbound(
        &mut self,
        msg: &InboundCommand,
        now_ms: u64,
        hw: &mut impl InductionPort,
    ) -> Result<Option<PowerLevel>> {
        if !self.topics.is_heater_command(&msg.topic) {
            debug!("app: ignoring message on '{}'", msg.topic);
            return Ok(None);
        }
        let cmd = AppCommand::from_payload(&msg.payload).inspect_err(|e| {
            warn!("app: rejected payload {:?}: {}", msg.payload.as_str(), e);
        })?;
        self.handle_command(cmd, now_ms, hw).map(Some)
    }

    // ── Telemetry ─────────────────────────────────────────────

    pub fn build_status_snapshot(&self, now_ms: u64) -> StatusSnapshot<'_> {
        StatusSnapshot {
            uptime_ms: now_ms,
            sensors: &self.readings,
            induction: self.induction.status(now_ms),
            faults: self.fault_mask(),
        }
    }

    pub fn fault_mask(&self) -> u8 {
        let mut mask = 0;
        if self.induction.state().line_fault.is_some() {
            mask |= SystemFault::CookerLine.mask();
        }
        if self.readings.iter().any(|r| !r.valid) {
            mask |= SystemFault::Sensor.mask();
        }
        if self.publish_dropped {
            mask |= SystemFault::PublishDropped.mask();
        }
        mask
    }

    // ── Start-up ──────────────────────────────────────────────

    pub fn lamp_test(&mut self, hw: &mut impl InductionPort, delay: &mut impl DelayNs) {
        self.induction.run_lamp_test(hw, delay);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn induction(&self) -> &InductionController {
        &self.induction
    }

    pub fn induction_status(&self, now_ms: u64) -> InductionStatus {
        self.induction.status(now_ms)
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    /// (published, dropped) status counts since boot.
    pub fn publish_counts(&self) -> (u64, u64) {
        (self.published, self.dropped)
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate
// ───────────────────────────────────────────────────────────────

/// Runs the service operation for each due task. Errors are logged and
/// never stop the loop.
pub struct TaskRunner<'a, H, P> {
    pub service: &'a mut AppService,
    pub hw: &'a mut H,
    pub publisher: &'a mut P,
}

impl<H, P> SchedulerDelegate for TaskRunner<'_, H, P>
where
    H: TemperaturePort + InductionPort,
    P: PublishPort,
{
    fn on_task_due(&mut self, task: TaskId, now_ms: u64) {
        match task {
            TaskId::InductionUpdate => self.service.update_induction(now_ms, self.hw),
            TaskId::ReadTemperature => {
                self.service.read_temperatures(now_ms, self.hw);
            }
            TaskId::SendStatus => {
                // Already logged and flagged by send_status.
                let _ = self.service.send_status(now_ms, self.publisher);
            }
        }
    }
}
