//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`TemperatureHub`] and the cooker's GPIOs, exposing them
//! through [`TemperaturePort`] and [`InductionPort`]. This is the only
//! module in the system that touches actual hardware. On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use embedded_hal::spi::SpiDevice;

use crate::app::ports::{InductionPort, TemperaturePort, TxBusy};
use crate::config::InductionConfig;
use crate::control::feedback::{EdgeBuffer, LINE_CAPTURE};
use crate::control::protocol::{Frame, PowerLevel};
use crate::drivers::{hw_init, hw_timer};
use crate::sensors::ds18b20::Thermometers;
use crate::sensors::{SensorReading, TemperatureHub};

/// The board's one-wire bus: one open-drain GPIO.
#[cfg(target_os = "espidf")]
pub type BoardOneWire = crate::sensors::ds18b20::OneWireThermometers<
    esp_idf_svc::hal::gpio::PinDriver<'static, esp_idf_svc::hal::gpio::AnyIOPin, esp_idf_svc::hal::gpio::InputOutput>,
    crate::drivers::delay::BusDelay,
>;

/// One MAX31865 on the shared VSPI host.
#[cfg(target_os = "espidf")]
pub type BoardSpi = esp_idf_svc::hal::spi::SpiDeviceDriver<
    'static,
    std::rc::Rc<esp_idf_svc::hal::spi::SpiDriver<'static>>,
>;

/// The adapter as wired on the brewing station board.
#[cfg(target_os = "espidf")]
pub type BoardAdapter = HardwareAdapter<BoardOneWire, BoardSpi>;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<B, S> {
    hub: TemperatureHub<B, S>,
    relay_gpio: i32,
    led_gpios: [i32; 6],
}

impl<B, S> HardwareAdapter<B, S>
where
    B: Thermometers,
    S: SpiDevice,
{
    pub fn new(hub: TemperatureHub<B, S>, cooker: &InductionConfig) -> Self {
        Self {
            hub,
            relay_gpio: cooker.relay_gpio,
            led_gpios: cooker.led_gpios,
        }
    }

    pub fn hub(&self) -> &TemperatureHub<B, S> {
        &self.hub
    }
}

// ── TemperaturePort implementation ────────────────────────────

impl<B, S> TemperaturePort for HardwareAdapter<B, S>
where
    B: Thermometers,
    S: SpiDevice,
{
    fn poll_all(&mut self, now_ms: u64) -> &[SensorReading] {
        self.hub.poll_all(now_ms)
    }
}

// ── InductionPort implementation ──────────────────────────────

impl<B, S> InductionPort for HardwareAdapter<B, S> {
    fn set_relay(&mut self, on: bool) {
        hw_init::gpio_write(self.relay_gpio, on);
    }

    fn set_indicator(&mut self, level: PowerLevel, on: bool) {
        if let Some(&gpio) = self.led_gpios.get(level.step()) {
            hw_init::gpio_write(gpio, on);
        }
    }

    fn transmit(&mut self, frame: Frame) -> Result<(), TxBusy> {
        hw_timer::start_frame(frame)
    }

    fn drain_feedback(&mut self, out: &mut EdgeBuffer) -> bool {
        LINE_CAPTURE.drain(out)
    }
}
