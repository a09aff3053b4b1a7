//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the station if the scheduler loop stalls. A stalled loop means the
//! cooker is no longer being re-asserted and the fan cooldown is no longer
//! tracked, so a reset into a known-off state is preferable.
//!
//! The scheduler loop calls `feed()` once per pass.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Many scheduler passes; one slow one-wire sweep never comes close.
pub const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: core::cell::Cell<u64>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling (scheduler) task.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: TWDT calls from the main task during start-up.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK as i32 {
                log::warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK as i32;
            if subscribed {
                info!("watchdog: scheduler task subscribed ({} ms, panic on trigger)", WATCHDOG_TIMEOUT_MS);
            } else {
                log::warn!("watchdog: failed to subscribe ({})", ret);
            }
            Self { subscribed }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("watchdog(sim): no-op ({} ms)", WATCHDOG_TIMEOUT_MS);
        Self {
            feeds: core::cell::Cell::new(0),
        }
    }

    /// Feed the watchdog. Must be called within [`WATCHDOG_TIMEOUT_MS`].
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the current task's TWDT entry only.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.feeds.set(self.feeds.get() + 1);
        }
    }

    /// How often the loop has fed the watchdog (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_watchdog_counts_feeds() {
        let wd = Watchdog::new();
        wd.feed();
        wd.feed();
        assert_eq!(wd.feeds(), 2);
    }
}
