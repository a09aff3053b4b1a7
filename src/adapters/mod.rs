//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to                      |
//! |-------------|-------------------|----------------------------------|
//! | `hardware`  | TemperaturePort   | One-wire bus, RTD converters     |
//! |             | InductionPort     | Relay, indicators, cooker lines  |
//! | `bus`       | PublishPort       | Outbound bus channel             |
//! | `log_sink`  | BusClient         | Serial log output                |
//! | `time`      | ClockPort         | ESP32 system timer               |

pub mod bus;
pub mod hardware;
pub mod log_sink;
pub mod time;
