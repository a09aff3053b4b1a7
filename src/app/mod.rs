//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the brewing station:
//! acquisition bookkeeping, induction control orchestration, telemetry
//! assembly and command handling. All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod ports;
pub mod service;
pub mod telemetry;
