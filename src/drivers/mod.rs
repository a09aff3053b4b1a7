//! Pin-level drivers, hardware initialisation, and peripheral helpers.

pub mod delay;
pub mod hw_init;
pub mod hw_timer;
pub mod task_pin;
pub mod watchdog;
