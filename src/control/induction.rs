//! Induction cooker power controller.
//!
//! Holds the requested and believed-actual power level, re-asserts the
//! level to the cooker every tick, drives the relay and the level
//! indicators, and runs the fan cooldown after the heat is turned off.
//!
//! ```text
//!   set_power ──▶ requested ──transmit──▶ actual ──▶ indicators
//!                     ▲                      ▲
//!                     └──── feedback ────────┘  (override / fault)
//! ```
//!
//! The cooldown deadline restarts on every nonzero→0 transition and is
//! never shortened by a later power-on: the fan overlaps the new cycle.
//!
//! Feedback frames that started before our last command finished on the
//! line describe the cooker's previous state and are only checked for
//! faults. A knob report never cancels an off command still waiting for
//! the line.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};
use serde::Serialize;

use super::feedback::{EdgeBuffer, FeedbackDecoder};
use super::protocol::{FRAME_US, FeedbackReport, PowerLevel};
use crate::app::ports::{InductionPort, TxBusy};
use crate::config::InductionConfig;
use crate::error::{CommandError, LineFault};

/// Controller state, readable for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InductionState {
    pub requested: PowerLevel,
    /// What the cooker is believed to run at.
    pub actual: PowerLevel,
    pub relay_on: bool,
    pub fan_active: bool,
    pub cooldown_deadline_ms: Option<u64>,
    pub last_command_ms: Option<u64>,
    /// Latched until the next accepted command.
    pub line_fault: Option<LineFault>,
}

/// Heater record as published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InductionStatus {
    pub requested: PowerLevel,
    pub actual: PowerLevel,
    pub relay: bool,
    pub fan: bool,
    pub cooldown_remaining_ms: u64,
    pub line_fault: Option<LineFault>,
    pub last_command_ms: Option<u64>,
}

pub struct InductionController {
    fan_delay_ms: u64,
    led_test_ms: u32,
    state: InductionState,
    decoder: FeedbackDecoder,
    edges: EdgeBuffer,
    /// End of the last frame we put on the line (µs).
    tx_end_us: u64,
}

impl InductionController {
    pub fn new(cfg: &InductionConfig) -> Self {
        Self {
            fan_delay_ms: u64::from(cfg.fan_delay_ms),
            led_test_ms: cfg.led_test_ms,
            state: InductionState::default(),
            decoder: FeedbackDecoder::new(),
            edges: EdgeBuffer::new(),
            tx_end_us: 0,
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Request a power level in percent.
    ///
    /// Anything outside {0, 20, 40, 60, 80, 100} is rejected before any
    /// state is touched.
    pub fn set_power(
        &mut self,
        percent: i64,
        now_ms: u64,
        port: &mut impl InductionPort,
    ) -> Result<PowerLevel, CommandError> {
        let level = PowerLevel::try_from(percent).inspect_err(|e| {
            warn!("induction: rejected command: {}", e);
        })?;

        if let Some(fault) = self.state.line_fault.take() {
            info!("induction: line fault {} cleared by new command", fault.code);
        }
        self.state.last_command_ms = Some(now_ms);
        info!("induction: power {} requested", level);

        self.request(level, now_ms);
        self.transmit(now_ms, port);
        self.apply_outputs(port);
        Ok(level)
    }

    fn request(&mut self, level: PowerLevel, now_ms: u64) {
        if self.state.requested.is_on() && !level.is_on() {
            self.start_cooldown(now_ms);
        }
        self.state.requested = level;
    }

    fn start_cooldown(&mut self, now_ms: u64) {
        let deadline = now_ms.saturating_add(self.fan_delay_ms);
        self.state.cooldown_deadline_ms = Some(deadline);
        info!("induction: fan cooldown until {} ms", deadline);
    }

    // ── Periodic tick ─────────────────────────────────────────

    /// Consume feedback, expire the cooldown, re-assert the level and
    /// refresh every output.
    pub fn tick(&mut self, now_ms: u64, port: &mut impl InductionPort) {
        self.consume_feedback(now_ms, port);

        if self.state.cooldown_deadline_ms.is_some_and(|d| now_ms >= d) {
            self.state.cooldown_deadline_ms = None;
            info!("induction: cooldown finished");
        }

        self.transmit(now_ms, port);
        self.apply_outputs(port);
    }

    fn consume_feedback(&mut self, now_ms: u64, port: &mut impl InductionPort) {
        self.edges.clear();
        if port.drain_feedback(&mut self.edges) {
            warn!("induction: feedback capture overflowed, resynchronising");
            self.decoder.reset();
        }
        for i in 0..self.edges.len() {
            let edge = self.edges[i];
            match self.decoder.feed(edge) {
                Some(Ok(report)) => {
                    let started_us = self.decoder.frame_start_us().unwrap_or(edge.at_us);
                    self.apply_report(report, started_us, now_ms);
                }
                Some(Err(e)) => warn!("induction: discarded feedback frame: {}", e),
                None => {}
            }
        }
    }

    fn apply_report(&mut self, report: FeedbackReport, started_us: u64, now_ms: u64) {
        if let Some(fault) = report.fault {
            error!("induction: cooker reported fault {}, forcing power off", fault.code);
            self.state.line_fault = Some(fault);
            self.state.requested = PowerLevel::Off;
            self.state.actual = PowerLevel::Off;
            self.start_cooldown(now_ms);
            return;
        }
        if started_us < self.tx_end_us {
            debug!("induction: ignoring {} report sent before our last command", report.level);
            return;
        }
        let off_pending = !self.state.requested.is_on() && self.state.actual.is_on();
        if off_pending && report.level.is_on() {
            warn!("induction: cooker reports {} while off is pending, re-sending off", report.level);
            self.state.actual = report.level;
            return;
        }
        if report.level == self.state.actual {
            return;
        }
        info!("induction: cooker override {} -> {}", self.state.actual, report.level);
        if self.state.actual.is_on() && !report.level.is_on() {
            self.start_cooldown(now_ms);
        }
        self.state.requested = report.level;
        self.state.actual = report.level;
    }

    fn transmit(&mut self, now_ms: u64, port: &mut impl InductionPort) {
        let level = self.state.requested;
        match port.transmit(level.frame()) {
            Ok(()) => {
                self.state.actual = level;
                self.tx_end_us = now_ms.saturating_mul(1_000).saturating_add(u64::from(FRAME_US));
            }
            Err(TxBusy) => debug!("induction: line busy, {} re-sent next tick", level),
        }
    }

    fn apply_outputs(&mut self, port: &mut impl InductionPort) {
        let heating = self.state.requested.is_on() || self.state.actual.is_on();
        let fan = heating || self.state.cooldown_deadline_ms.is_some();
        if fan != self.state.relay_on {
            info!("induction: relay {}", if fan { "on" } else { "off" });
        }
        self.state.fan_active = fan;
        self.state.relay_on = fan;
        port.set_relay(fan);

        let actual = self.state.actual;
        for level in PowerLevel::ALL {
            port.set_indicator(level, level == actual && level.is_on());
        }
    }

    // ── Start-up ──────────────────────────────────────────────

    /// Light every indicator in turn, then leave them all off.
    pub fn run_lamp_test(&mut self, port: &mut impl InductionPort, delay: &mut impl DelayNs) {
        for level in PowerLevel::ALL {
            port.set_indicator(level, true);
            delay.delay_ms(self.led_test_ms);
            port.set_indicator(level, false);
        }
        info!("induction: lamp test done");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &InductionState {
        &self.state
    }

    pub fn status(&self, now_ms: u64) -> InductionStatus {
        InductionStatus {
            requested: self.state.requested,
            actual: self.state.actual,
            relay: self.state.relay_on,
            fan: self.state.fan_active,
            cooldown_remaining_ms: self
                .state
                .cooldown_deadline_ms
                .map_or(0, |d| d.saturating_sub(now_ms)),
            line_fault: self.state.line_fault,
            last_command_ms: self.state.last_command_ms,
        }
    }
}
