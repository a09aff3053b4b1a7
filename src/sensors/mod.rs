//! Temperature acquisition — individual drivers and the aggregating
//! [`TemperatureHub`].
//!
//! The hub owns the one-wire bus and every RTD converter and keeps one
//! [`SensorReading`] slot per configured sensor. Slots are overwritten on
//! each poll; nothing is kept beyond the latest value.

pub mod ds18b20;
pub mod rtd;

use core::fmt::Write as _;

use embedded_hal::spi::SpiDevice;
use heapless::{String, Vec};
use log::{info, warn};
use serde::Serialize;

use crate::config::{MAX_ONEWIRE_SENSORS, MAX_RTD_PROBES, OneWireConfig};
use crate::error::SensorFault;
use ds18b20::{Ds18b20Bus, Thermometers};
use rtd::Max31865;

/// One slot per one-wire sensor plus one per RTD probe.
pub const MAX_READINGS: usize = MAX_ONEWIRE_SENSORS + MAX_RTD_PROBES;

/// Sensor identifier: ROM hex for one-wire devices, `ow<N>` for a
/// configured device that was never found, `rtd<N>` for RTD probes.
pub type SensorId = String<16>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    OneWire,
    Rtd,
}

/// Latest value of one sensor.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub id: SensorId,
    pub kind: SensorKind,
    /// 1/16 °C counts for one-wire, 15-bit ratio for RTD.
    #[serde(rename = "raw")]
    pub raw_value: i32,
    /// NaN (serialised as `null`) while invalid.
    pub temperature_c: f32,
    pub timestamp_ms: u64,
    pub valid: bool,
    pub fault: Option<SensorFault>,
}

impl SensorReading {
    /// A slot that has not been acquired yet.
    pub fn pending(id: SensorId, kind: SensorKind) -> Self {
        Self {
            id,
            kind,
            raw_value: 0,
            temperature_c: f32::NAN,
            timestamp_ms: 0,
            valid: false,
            fault: Some(SensorFault::NoData),
        }
    }

    fn record(&mut self, raw_value: i32, temperature_c: f32, now_ms: u64) {
        self.raw_value = raw_value;
        self.temperature_c = temperature_c;
        self.timestamp_ms = now_ms;
        self.valid = true;
        self.fault = None;
    }

    fn invalidate(&mut self, fault: SensorFault, now_ms: u64) {
        self.temperature_c = f32::NAN;
        self.timestamp_ms = now_ms;
        self.valid = false;
        self.fault = Some(fault);
    }

    /// Temperature if the reading is valid.
    pub fn celsius(&self) -> Option<f32> {
        self.valid.then_some(self.temperature_c)
    }
}

fn indexed_id(prefix: &str, n: usize) -> SensorId {
    let mut id = SensorId::new();
    let _ = write!(id, "{prefix}{n}");
    id
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

pub struct TemperatureHub<B, S> {
    onewire: Ds18b20Bus<B>,
    rtds: Vec<Max31865<S>, MAX_RTD_PROBES>,
    expected_onewire: usize,
    readings: Vec<SensorReading, MAX_READINGS>,
}

impl<B, S> TemperatureHub<B, S>
where
    B: Thermometers,
    S: SpiDevice,
{
    pub fn new(bus: B, rtds: Vec<Max31865<S>, MAX_RTD_PROBES>, cfg: &OneWireConfig) -> Self {
        Self {
            onewire: Ds18b20Bus::new(bus, cfg.resolution_bits),
            rtds,
            expected_onewire: usize::from(cfg.sensor_count).min(MAX_ONEWIRE_SENSORS),
            readings: Vec::new(),
        }
    }

    /// Discover the bus, configure every converter and lay out the
    /// reading slots. Failures are recorded in the slots, never fatal.
    pub fn start(&mut self, now_ms: u64) {
        self.readings.clear();

        let found = match self.onewire.discover(self.expected_onewire) {
            Ok(n) => n,
            Err(e) => {
                warn!("onewire: discovery failed: {}", e);
                0
            }
        };
        for rom in self.onewire.roms() {
            let _ = self
                .readings
                .push(SensorReading::pending(ds18b20::rom_hex(rom), SensorKind::OneWire));
        }
        for n in found..self.expected_onewire {
            let mut slot = SensorReading::pending(indexed_id("ow", n), SensorKind::OneWire);
            slot.invalidate(SensorFault::Disconnected, now_ms);
            let _ = self.readings.push(slot);
        }
        if found < self.expected_onewire {
            warn!("onewire: {} of {} thermometers missing", self.expected_onewire - found, self.expected_onewire);
        }

        for (n, rtd) in self.rtds.iter_mut().enumerate() {
            let mut slot = SensorReading::pending(indexed_id("rtd", n), SensorKind::Rtd);
            if let Err(e) = rtd.init() {
                warn!("rtd{}: init failed: {}", n, e);
                slot.invalidate(e, now_ms);
            }
            let _ = self.readings.push(slot);
        }

        info!("sensors: {} reading slots", self.readings.len());
    }

    /// Poll every sensor once. Never blocks on a one-wire conversion.
    pub fn poll_all(&mut self, now_ms: u64) -> &[SensorReading] {
        self.poll_onewire(now_ms);

        let rtd_base = self.expected_onewire;
        for (n, rtd) in self.rtds.iter_mut().enumerate() {
            let Some(slot) = self.readings.get_mut(rtd_base + n) else {
                continue;
            };
            match rtd.read() {
                Ok(s) => slot.record(i32::from(s.ratio), s.temperature_c, now_ms),
                Err(e) => slot.invalidate(e, now_ms),
            }
        }

        &self.readings
    }

    fn poll_onewire(&mut self, now_ms: u64) {
        let found = self.onewire.roms().len();
        if found == 0 {
            return;
        }

        if self.onewire.is_converting() {
            if !self.onewire.conversion_due(now_ms) {
                return;
            }
            match self.onewire.conversion_complete() {
                Ok(true) => self.collect_onewire(found, now_ms),
                Ok(false) => {
                    warn!("onewire: conversion still running after its worst-case time");
                    self.invalidate_onewire(SensorFault::Timeout, now_ms);
                }
                Err(e) => self.invalidate_onewire(e, now_ms),
            }
            self.onewire.finish_conversion();
        }

        if let Err(e) = self.onewire.start_conversion(now_ms) {
            // No presence pulse: every thermometer is gone at once.
            self.invalidate_onewire(e, now_ms);
        }
    }

    fn collect_onewire(&mut self, found: usize, now_ms: u64) {
        for i in 0..found {
            let rom = self.onewire.roms()[i];
            let result = self.onewire.read(&rom);
            let slot = &mut self.readings[i];
            match result {
                Ok(celsius) => slot.record(i32::from(ds18b20::celsius_to_raw(celsius)), celsius, now_ms),
                Err(e) => slot.invalidate(e, now_ms),
            }
        }
    }

    fn invalidate_onewire(&mut self, fault: SensorFault, now_ms: u64) {
        for slot in &mut self.readings[..self.expected_onewire] {
            slot.invalidate(fault, now_ms);
        }
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }
}
