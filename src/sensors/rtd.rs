//! MAX31865 RTD-to-digital converter (PT100 / PT1000).
//!
//! The converter runs in automatic conversion mode with V_BIAS permanently
//! on, so a read is just two register fetches. Any `embedded-hal` SPI
//! device works; the board uses an `esp-idf-hal` device on the VSPI host.

use embedded_hal::spi::{Operation, SpiDevice};
use log::{info, warn};

use crate::config::{MainsFilter, RtdConfig, RtdWiring};
use crate::error::SensorFault;

// ── Registers ─────────────────────────────────────────────────

const REG_CONFIG: u8 = 0x00;
const REG_RTD_MSB: u8 = 0x01;
const REG_FAULT_STATUS: u8 = 0x07;
const WRITE_FLAG: u8 = 0x80;

const CFG_VBIAS: u8 = 0x80;
const CFG_AUTO: u8 = 0x40;
const CFG_3WIRE: u8 = 0x10;
const CFG_FAULT_CLEAR: u8 = 0x02;
const CFG_FILTER_50HZ: u8 = 0x01;

/// Full-scale ADC count (15 bit).
pub const RATIO_FULL_SCALE: u16 = 0x7FFF;

pub const MIN_TEMP_C: f32 = -200.0;
pub const MAX_TEMP_C: f32 = 850.0;

// ── Callendar–Van Dusen ───────────────────────────────────────

const CVD_A: f32 = 3.9083e-3;
const CVD_B: f32 = -5.775e-7;
const CVD_C: f32 = -4.183e-12;

/// Element resistance from the ADC ratio.
pub fn resistance_from_ratio(ratio: u16, r_ref_ohm: f32) -> f32 {
    f32::from(ratio) / 32768.0 * r_ref_ohm
}

/// Temperature from element resistance.
///
/// Inverts the quadratic Callendar–Van Dusen equation for T ≥ 0 °C and uses
/// a fifth-order fit (normalised to a 100 Ω element) below that.
pub fn temperature_from_resistance(r_ohm: f32, r_nominal_ohm: f32) -> f32 {
    let z1 = -CVD_A;
    let z2 = CVD_A * CVD_A - 4.0 * CVD_B;
    let z3 = 4.0 * CVD_B / r_nominal_ohm;
    let z4 = 2.0 * CVD_B;

    let t = ((z2 + z3 * r_ohm).sqrt() + z1) / z4;
    if t >= 0.0 {
        return t;
    }

    let r = r_ohm / r_nominal_ohm * 100.0;
    let mut rpoly = r;
    let mut t = -242.02;
    t += 2.2228 * rpoly;
    rpoly *= r;
    t += 2.5859e-3 * rpoly;
    rpoly *= r;
    t -= 4.8260e-6 * rpoly;
    rpoly *= r;
    t -= 2.8183e-8 * rpoly;
    rpoly *= r;
    t += 1.5243e-10 * rpoly;
    t
}

/// Element resistance at a temperature (forward Callendar–Van Dusen).
pub fn resistance_at(temp_c: f32, r_nominal_ohm: f32) -> f32 {
    let t = temp_c;
    let mut k = 1.0 + CVD_A * t + CVD_B * t * t;
    if t < 0.0 {
        k += CVD_C * (t - 100.0) * t * t * t;
    }
    r_nominal_ohm * k
}

// ── Driver ────────────────────────────────────────────────────

/// One conversion result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtdSample {
    /// 15-bit ADC ratio.
    pub ratio: u16,
    pub resistance_ohm: f32,
    /// Calibrated (offset applied).
    pub temperature_c: f32,
}

pub struct Max31865<S> {
    spi: S,
    cfg: RtdConfig,
}

impl<S: SpiDevice> Max31865<S> {
    pub fn new(spi: S, cfg: RtdConfig) -> Self {
        Self { spi, cfg }
    }

    /// Configuration register value for this probe.
    pub fn config_value(&self) -> u8 {
        let mut v = CFG_VBIAS | CFG_AUTO;
        if self.cfg.wiring == RtdWiring::ThreeWire {
            v |= CFG_3WIRE;
        }
        if self.cfg.filter == MainsFilter::Hz50 {
            v |= CFG_FILTER_50HZ;
        }
        v
    }

    /// Program the converter and verify it answers.
    pub fn init(&mut self) -> Result<(), SensorFault> {
        let cfg = self.config_value();
        self.write_reg(REG_CONFIG, cfg | CFG_FAULT_CLEAR)?;
        let mut readback = [0u8; 1];
        self.read_regs(REG_CONFIG, &mut readback)?;
        if readback[0] & !CFG_FAULT_CLEAR != cfg {
            warn!("rtd: config readback 0x{:02X}, expected 0x{:02X}", readback[0], cfg);
            return Err(SensorFault::Disconnected);
        }
        info!(
            "rtd: {:?}, {:?} filter, R_ref={} Ω, R0={} Ω",
            self.cfg.wiring, self.cfg.filter, self.cfg.r_ref_ohm, self.cfg.r_nominal_ohm
        );
        Ok(())
    }

    /// Fetch the latest automatic conversion.
    pub fn read(&mut self) -> Result<RtdSample, SensorFault> {
        let mut buf = [0u8; 2];
        self.read_regs(REG_RTD_MSB, &mut buf)?;
        let word = u16::from_be_bytes(buf);

        if word & 0x0001 != 0 {
            let mut status = [0u8; 1];
            self.read_regs(REG_FAULT_STATUS, &mut status)?;
            self.clear_fault()?;
            return Err(SensorFault::RtdFault(status[0]));
        }

        let ratio = word >> 1;
        if ratio == 0 || ratio == RATIO_FULL_SCALE {
            return Err(SensorFault::OutOfRange);
        }

        let resistance_ohm = resistance_from_ratio(ratio, self.cfg.r_ref_ohm);
        let temperature_c =
            temperature_from_resistance(resistance_ohm, self.cfg.r_nominal_ohm) + self.cfg.offset_c;
        if !temperature_c.is_finite() || !(MIN_TEMP_C..=MAX_TEMP_C).contains(&temperature_c) {
            return Err(SensorFault::OutOfRange);
        }

        Ok(RtdSample {
            ratio,
            resistance_ohm,
            temperature_c,
        })
    }

    fn clear_fault(&mut self) -> Result<(), SensorFault> {
        let cfg = self.config_value();
        self.write_reg(REG_CONFIG, cfg | CFG_FAULT_CLEAR)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorFault> {
        self.spi
            .write(&[reg | WRITE_FLAG, value])
            .map_err(|_| SensorFault::BusError)
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorFault> {
        self.spi
            .transaction(&mut [Operation::Write(&[reg & !WRITE_FLAG]), Operation::Read(buf)])
            .map_err(|_| SensorFault::BusError)
    }
}

// ---------------------------------------------------------------------------
// Register-level converter model for host tests
// ---------------------------------------------------------------------------
