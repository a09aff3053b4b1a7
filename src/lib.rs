//! Brewstation firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod pins;
pub mod scheduler;

// Hardware-facing modules compile on every target; the ESP-IDF calls are
// guarded by cfg attributes inside and fall back to simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod sensors;
