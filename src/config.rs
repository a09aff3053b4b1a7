//! System configuration parameters
//!
//! All tunable parameters for the brewing station. The configuration is
//! built once at boot from [`SystemConfig::default`] (the board values),
//! checked with [`SystemConfig::validate`], and then passed by reference
//! to every component. Nothing reconfigures it at runtime.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::control::feedback::MAX_TICK_MS;
use crate::error::{Error, Result};
use crate::pins;

/// Upper bound on one-wire sensors sharing the bus.
pub const MAX_ONEWIRE_SENSORS: usize = 8;
/// The board has room for one or two RTD converters.
pub const MAX_RTD_PROBES: usize = 2;

/// Bounded label used for topic segments.
pub type Label = String<24>;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub onewire: OneWireConfig,
    pub rtd: Vec<RtdConfig, MAX_RTD_PROBES>,
    pub timing: TimingConfig,
    pub induction: InductionConfig,
    pub topics: TopicConfig,
}

/// DS18B20 bus settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OneWireConfig {
    /// Data bus pin (open drain, external pull-up).
    pub bus_gpio: i32,
    /// Number of sensors expected on the bus.
    pub sensor_count: u8,
    /// Conversion resolution in bits (9–12).
    pub resolution_bits: u8,
}

/// Lead configuration of the RTD element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtdWiring {
    TwoWire,
    ThreeWire,
    FourWire,
}

/// Mains notch filter of the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainsFilter {
    Hz50,
    Hz60,
}

/// One MAX31865 RTD probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RtdConfig {
    pub cs_gpio: i32,
    /// Converter SDI.
    pub di_gpio: i32,
    /// Converter SDO.
    pub do_gpio: i32,
    pub clk_gpio: i32,
    /// Reference resistor on the board (430 Ω for PT100, 4300 Ω for PT1000).
    pub r_ref_ohm: f32,
    /// Element resistance at 0 °C (100 Ω or 1000 Ω).
    pub r_nominal_ohm: f32,
    pub wiring: RtdWiring,
    pub filter: MainsFilter,
    /// Added to every converted temperature (°C).
    pub offset_c: f32,
}

/// Periods of the scheduled tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Temperature acquisition period (milliseconds)
    pub read_temp_interval_ms: u32,
    /// Telemetry publish period (milliseconds)
    pub status_interval_ms: u32,
    /// Induction refresh period (milliseconds)
    pub induction_interval_ms: u32,
    /// Sleep between scheduler passes so network tasks can run.
    pub loop_yield_ms: u32,
}

/// Induction cooker wiring and timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InductionConfig {
    pub relay_gpio: i32,
    pub tx_gpio: i32,
    pub interrupt_gpio: i32,
    /// Minimum fan run time after heating stops (milliseconds).
    pub fan_delay_ms: u32,
    /// Indicator LED per power step, in step order (0 %, 20 %, … 100 %).
    pub led_gpios: [i32; 6],
    /// Per-LED on time of the boot lamp test (milliseconds).
    pub led_test_ms: u32,
}

/// Message bus topic segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    pub root: Label,
    pub device: Label,
    pub status: Label,
    pub heater_status: Label,
    pub heater_command: Label,
}

fn label(s: &str) -> Label {
    let mut out = Label::new();
    // Defaults are short literals; an overflow would leave the label empty
    // and fail validation.
    let _ = out.push_str(s);
    out
}

impl Default for RtdConfig {
    fn default() -> Self {
        Self {
            cs_gpio: pins::RTD_CS_GPIO,
            di_gpio: pins::RTD_DI_GPIO,
            do_gpio: pins::RTD_DO_GPIO,
            clk_gpio: pins::RTD_CLK_GPIO,
            // PT1000 board
            r_ref_ohm: 4300.0,
            r_nominal_ohm: 1000.0,
            wiring: RtdWiring::TwoWire,
            filter: MainsFilter::Hz50,
            offset_c: 0.0,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut rtd = Vec::new();
        let _ = rtd.push(RtdConfig::default());

        Self {
            onewire: OneWireConfig {
                bus_gpio: pins::ONEWIRE_BUS_GPIO,
                sensor_count: 2,
                resolution_bits: 11,
            },
            rtd,
            timing: TimingConfig {
                read_temp_interval_ms: 100,
                status_interval_ms: 600,
                induction_interval_ms: 700,
                loop_yield_ms: 10,
            },
            induction: InductionConfig {
                relay_gpio: pins::INDUCTION_RELAY_GPIO,
                tx_gpio: pins::INDUCTION_TX_GPIO,
                interrupt_gpio: pins::INDUCTION_INTERRUPT_GPIO,
                // Factory default is 120 s; 60 s is plenty for this cooker.
                fan_delay_ms: 60_000,
                led_gpios: pins::INDUCTION_LED_GPIOS,
                led_test_ms: 150,
            },
            topics: TopicConfig {
                root: label("root"),
                device: label("brewery"),
                status: label("status"),
                heater_status: label("heater"),
                heater_command: label("heater/power"),
            },
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Rejects, never clamps.
    pub fn validate(&self) -> Result<()> {
        let ow = &self.onewire;
        if !(9..=12).contains(&ow.resolution_bits) {
            return Err(Error::Config("onewire.resolution_bits must be 9..=12"));
        }
        if ow.sensor_count as usize > MAX_ONEWIRE_SENSORS {
            return Err(Error::Config("onewire.sensor_count exceeds bus capacity"));
        }

        if self.rtd.is_empty() {
            return Err(Error::Config("at least one RTD probe is required"));
        }
        let bus = &self.rtd[0];
        for (i, probe) in self.rtd.iter().enumerate() {
            if (probe.clk_gpio, probe.di_gpio, probe.do_gpio) != (bus.clk_gpio, bus.di_gpio, bus.do_gpio) {
                return Err(Error::Config("rtd converters must share clk/di/do (one SPI host)"));
            }
            if self.rtd[i + 1..].iter().any(|p| p.cs_gpio == probe.cs_gpio) {
                return Err(Error::Config("rtd.cs_gpio must be distinct"));
            }
            if probe.r_nominal_ohm <= 0.0 {
                return Err(Error::Config("rtd.r_nominal_ohm must be positive"));
            }
            if probe.r_ref_ohm <= probe.r_nominal_ohm {
                return Err(Error::Config("rtd.r_ref_ohm must exceed r_nominal_ohm"));
            }
            if !probe.offset_c.is_finite() {
                return Err(Error::Config("rtd.offset_c must be finite"));
            }
        }

        let t = &self.timing;
        if t.read_temp_interval_ms == 0 || t.status_interval_ms == 0 || t.induction_interval_ms == 0 {
            return Err(Error::Config("task periods must be nonzero"));
        }
        let shortest = t
            .read_temp_interval_ms
            .min(t.status_interval_ms)
            .min(t.induction_interval_ms);
        if t.loop_yield_ms >= shortest {
            return Err(Error::Config("timing.loop_yield_ms must be below the shortest period"));
        }
        if t.induction_interval_ms > MAX_TICK_MS {
            // Longer ticks would overflow the feedback capture.
            return Err(Error::Config("timing.induction_interval_ms exceeds the feedback capture"));
        }

        let leds = &self.induction.led_gpios;
        for (i, a) in leds.iter().enumerate() {
            if leds[i + 1..].contains(a) {
                return Err(Error::Config("induction.led_gpios must be distinct"));
            }
        }

        let topics = &self.topics;
        if topics.root.is_empty()
            || topics.device.is_empty()
            || topics.status.is_empty()
            || topics.heater_status.is_empty()
            || topics.heater_command.is_empty()
        {
            return Err(Error::Config("topic segments must not be empty"));
        }

        Ok(())
    }
}
