//! Cooker command-line transmitter on ESP-IDF's esp_timer API.
//!
//! A frame is expanded into its [`PulseTrain`] and stepped by a one-shot
//! timer: each callback drives the line to the next pulse level and re-arms
//! the timer for that pulse's duration. The control loop never waits on a
//! transmission; a second frame requested while one is on the line is
//! reported busy.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR) and
//! share the train with the control loop through a critical-section mutex.
//! On simulation targets the whole train is stepped synchronously.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::app::ports::TxBusy;
use crate::control::protocol::{Frame, Pulse, PulseTrain};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
use super::hw_init::HwInitError;

/// The frame currently on the line, shared with the timer callback.
pub struct PulseSequencer {
    train: Mutex<CriticalSectionRawMutex, Cell<Option<PulseTrain>>>,
}

impl PulseSequencer {
    pub const fn new() -> Self {
        Self {
            train: Mutex::new(Cell::new(None)),
        }
    }

    /// Take the line for `frame`, unless another frame still holds it.
    pub fn claim(&self, frame: Frame) -> Result<(), TxBusy> {
        self.train.lock(|t| {
            if t.get().is_some() {
                return Err(TxBusy);
            }
            t.set(Some(PulseTrain::new(frame)));
            Ok(())
        })
    }

    /// Next pulse to put on the line; `None` releases the line.
    pub fn advance(&self) -> Option<Pulse> {
        self.train.lock(|t| {
            let mut train = t.get()?;
            let pulse = train.next();
            t.set(pulse.map(|_| train));
            pulse
        })
    }

    /// Abandon the frame on the line.
    pub fn release(&self) {
        self.train.lock(|t| t.set(None));
    }

    pub fn is_busy(&self) -> bool {
        self.train.lock(|t| t.get().is_some())
    }
}

impl Default for PulseSequencer {
    fn default() -> Self {
        Self::new()
    }
}

static SEQUENCER: PulseSequencer = PulseSequencer::new();

// ── ESP-IDF one-shot timer chain ──────────────────────────────

#[cfg(target_os = "espidf")]
static mut PULSE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
static TX_GPIO: core::sync::atomic::AtomicI32 = core::sync::atomic::AtomicI32::new(-1);

/// SAFETY: PULSE_TIMER is written once in `init_pulse_timer()` before any
/// frame is started; read-only afterwards.
#[cfg(target_os = "espidf")]
unsafe fn pulse_timer() -> esp_timer_handle_t {
    unsafe { PULSE_TIMER }
}

#[cfg(target_os = "espidf")]
fn step_line() {
    let gpio = TX_GPIO.load(core::sync::atomic::Ordering::Relaxed);
    // SAFETY: the TX pin was configured as an output in hw_init and is
    // only driven from here; the timer handle is valid after init.
    unsafe {
        match SEQUENCER.advance() {
            Some(pulse) => {
                gpio_set_level(gpio, u32::from(pulse.high));
                let ret = esp_timer_start_once(pulse_timer(), u64::from(pulse.duration_us));
                if ret != ESP_OK as i32 {
                    // Nothing will step the rest of the train.
                    gpio_set_level(gpio, 0);
                    SEQUENCER.release();
                    warn!("hw_timer: pulse timer re-arm failed (rc={}), frame abandoned", ret);
                }
            }
            None => {
                gpio_set_level(gpio, 0);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pulse_cb(_arg: *mut core::ffi::c_void) {
    step_line();
}

/// Create the one-shot pulse timer for the command line on `tx_gpio`.
#[cfg(target_os = "espidf")]
pub fn init_pulse_timer(tx_gpio: i32) -> Result<(), HwInitError> {
    TX_GPIO.store(tx_gpio, core::sync::atomic::Ordering::Relaxed);
    // SAFETY: PULSE_TIMER is written here once at boot from the main task
    // before any frame is started.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(pulse_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"cooker-tx\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut PULSE_TIMER);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
    }
    info!("hw_timer: cooker command line on GPIO{}", tx_gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_pulse_timer(tx_gpio: i32) -> Result<(), super::hw_init::HwInitError> {
    log::info!("hw_timer(sim): cooker command line on GPIO{} (no timer)", tx_gpio);
    Ok(())
}

/// Start transmitting `frame`. Returns immediately.
#[cfg(target_os = "espidf")]
pub fn start_frame(frame: Frame) -> Result<(), TxBusy> {
    SEQUENCER.claim(frame)?;
    step_line();
    Ok(())
}

/// Simulation: the train is stepped to completion at once.
#[cfg(not(target_os = "espidf"))]
pub fn start_frame(frame: Frame) -> Result<(), TxBusy> {
    SEQUENCER.claim(frame)?;
    let mut on_air_us = 0u32;
    while let Some(pulse) = SEQUENCER.advance() {
        on_air_us += pulse.duration_us;
    }
    log::debug!("hw_timer(sim): frame 0x{:09X} sent ({} µs)", frame.0, on_air_us);
    Ok(())
}
