//! Mock hardware and publisher adapters for integration tests.
//!
//! Records every port call so tests can assert on the full output
//! history without touching real GPIO registers.

use std::collections::VecDeque;

use brewstation::app::ports::{InductionPort, PublishPort, TemperaturePort, TxBusy};
use brewstation::control::feedback::{EdgeBuffer, Edge, pulse_edges};
use brewstation::control::protocol::{FeedbackReport, Frame, PowerLevel};
use brewstation::error::{PublishError, SensorFault};
use brewstation::sensors::{SensorKind, SensorReading};
use embedded_hal::delay::DelayNs;

// ── Readings ──────────────────────────────────────────────────

pub fn valid_reading(id: &str, kind: SensorKind, celsius: f32) -> SensorReading {
    let mut r = SensorReading::pending(id.try_into().unwrap(), kind);
    r.raw_value = (celsius * 16.0) as i32;
    r.temperature_c = celsius;
    r.valid = true;
    r.fault = None;
    r
}

pub fn faulted_reading(id: &str, kind: SensorKind, fault: SensorFault) -> SensorReading {
    let mut r = SensorReading::pending(id.try_into().unwrap(), kind);
    r.fault = Some(fault);
    r
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub readings: Vec<SensorReading>,
    pub polls: usize,
    pub relay: bool,
    pub lit: [bool; 6],
    pub indicator_log: Vec<(PowerLevel, bool)>,
    pub frames: Vec<Frame>,
    /// Refuse every transmission.
    pub busy: bool,
    pub feedback: VecDeque<Edge>,
    pub overflow: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: Vec<SensorReading>) -> Self {
        Self { readings, ..Self::default() }
    }

    /// Queue the edges the cooker would produce for `report`.
    pub fn queue_report(&mut self, report: FeedbackReport, start_us: u64) {
        let frame = Frame::encode(report.status_byte());
        self.feedback.extend(pulse_edges(frame, start_us));
    }

    pub fn lit_levels(&self) -> Vec<PowerLevel> {
        PowerLevel::ALL.into_iter().filter(|l| self.lit[l.step()]).collect()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.frames.last().copied()
    }
}

impl TemperaturePort for MockHardware {
    fn poll_all(&mut self, _now_ms: u64) -> &[SensorReading] {
        self.polls += 1;
        &self.readings
    }
}

impl InductionPort for MockHardware {
    fn set_relay(&mut self, on: bool) {
        self.relay = on;
    }

    fn set_indicator(&mut self, level: PowerLevel, on: bool) {
        self.lit[level.step()] = on;
        self.indicator_log.push((level, on));
    }

    fn transmit(&mut self, frame: Frame) -> Result<(), TxBusy> {
        if self.busy {
            return Err(TxBusy);
        }
        self.frames.push(frame);
        Ok(())
    }

    fn drain_feedback(&mut self, out: &mut EdgeBuffer) -> bool {
        while let Some(&edge) = self.feedback.front() {
            if out.push(edge).is_err() {
                break;
            }
            self.feedback.pop_front();
        }
        core::mem::take(&mut self.overflow)
    }
}

// ── MockPublisher ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockPublisher {
    pub messages: Vec<(String, String)>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }

    pub fn last_json(&self, topic: &str) -> serde_json::Value {
        let payload = self.on_topic(topic).last().copied().expect("nothing published on topic");
        serde_json::from_str(payload).expect("payload is not JSON")
    }
}

impl PublishPort for MockPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Unavailable);
        }
        self.messages.push((topic.into(), payload.into()));
        Ok(())
    }
}

// ── CountingDelay ─────────────────────────────────────────────

/// Delay that only adds up the requested time.
#[derive(Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
