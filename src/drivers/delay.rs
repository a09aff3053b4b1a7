//! Busy-wait and task delays.
//!
//! The one-wire crates time their slots through the `embedded-hal` 0.2
//! delay trait; the lamp test uses the 1.0 [`DelayNs`].

#[cfg(not(target_os = "espidf"))]
use embedded_hal::delay::DelayNs;

// ── Microsecond busy-wait ─────────────────────────────────────

/// ROM busy-wait delay for one-wire slots.
#[cfg(target_os = "espidf")]
pub type BusDelay = esp_idf_svc::hal::delay::Ets;

/// Simulation: bus timing is meaningless without real lines.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct BusDelay;

#[cfg(not(target_os = "espidf"))]
impl embedded_hal_0_2::blocking::delay::DelayUs<u16> for BusDelay {
    fn delay_us(&mut self, _us: u16) {}
}

// ── Millisecond task delay ────────────────────────────────────

/// Millisecond delay for start-up sequences (lamp test).
#[cfg(target_os = "espidf")]
pub type TaskDelay = esp_idf_svc::hal::delay::FreeRtos;

#[cfg(target_os = "espidf")]
pub fn task_delay() -> TaskDelay {
    esp_idf_svc::hal::delay::FreeRtos
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskDelay;

#[cfg(not(target_os = "espidf"))]
impl DelayNs for TaskDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn task_delay() -> TaskDelay {
    TaskDelay
}
