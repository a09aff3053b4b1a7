//! One-shot hardware peripheral initialization.
//!
//! Configures the cooker relay, command line, indicators and feedback
//! input, and installs the feedback-line edge interrupt, using raw ESP-IDF
//! sys calls. Called once from `main()` before the scheduler loop starts.
//! The sensor buses own their pins through `esp-idf-hal` drivers.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::config::SystemConfig;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { gpio: i32, rc: i32 },
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
    TimerCreateFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { gpio, rc } => write!(f, "GPIO{} config failed (rc={})", gpio, rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "feedback ISR registration failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "pulse timer create failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(match e {
            HwInitError::GpioConfigFailed { .. } => "gpio config",
            HwInitError::IsrInstallFailed(_) => "isr service",
            HwInitError::IsrHandlerFailed(_) => "feedback isr",
            HwInitError::TimerCreateFailed(_) => "pulse timer",
        })
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
pub fn init_peripherals(config: &SystemConfig) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe {
        init_cooker_outputs(config)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(config: &SystemConfig) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): peripheral init skipped (relay GPIO{}, command GPIO{})",
        config.induction.relay_gpio,
        config.induction.tx_gpio
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn configure(gpio: i32, mode: gpio_mode_t, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    let rc = unsafe { gpio_config(&cfg) };
    if rc != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { gpio, rc });
    }
    Ok(())
}

// ── Cooker outputs ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_cooker_outputs(config: &SystemConfig) -> Result<(), HwInitError> {
    let ind = &config.induction;
    let outputs = [ind.relay_gpio, ind.tx_gpio]
        .into_iter()
        .chain(ind.led_gpios.iter().copied());
    for gpio in outputs {
        unsafe {
            configure(gpio, gpio_mode_t_GPIO_MODE_OUTPUT, false)?;
            gpio_set_level(gpio, 0);
        }
    }
    unsafe { configure(ind.interrupt_gpio, gpio_mode_t_GPIO_MODE_INPUT, true)? };
    info!("hw_init: cooker relay, command line and indicators configured");
    Ok(())
}

// ── Raw pin access ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured pin; safe from any context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to a pin configured during
    // init_peripherals(). Each pin has a single owner.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Feedback-line ISR ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::control::feedback::{Edge, LINE_CAPTURE};

/// Timestamp the edge and queue it; decoding happens in the induction tick.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn feedback_isr(arg: *mut core::ffi::c_void) {
    let pin = arg as usize as i32;
    // SAFETY: esp_timer_get_time and gpio_get_level are register reads;
    // safe in ISR context.
    let (at_us, level) = unsafe { (esp_timer_get_time(), gpio_get_level(pin)) };
    LINE_CAPTURE.record(Edge {
        at_us: at_us as u64,
        high: level != 0,
    });
}

/// Install the per-pin GPIO ISR service and hook the feedback line.
/// Call after init_peripherals() and before the scheduler loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(interrupt_gpio: i32) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handler only takes
    // a critical section to push into the capture buffer.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_set_intr_type(interrupt_gpio, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        let ret = gpio_isr_handler_add(
            interrupt_gpio,
            Some(feedback_isr),
            interrupt_gpio as usize as *mut core::ffi::c_void,
        );
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
        gpio_intr_enable(interrupt_gpio);
    }
    info!("hw_init: feedback ISR on GPIO{}", interrupt_gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(interrupt_gpio: i32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): feedback ISR on GPIO{} skipped", interrupt_gpio);
    Ok(())
}
