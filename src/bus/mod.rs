//! Message bus plumbing between the scheduler loop and the network.
//!
//! ```text
//! ┌──────────────┐  BusMessage      ┌──────────────┐
//! │  Scheduler   │─────OUTBOUND───▶│   Bus I/O    │──▶ BusClient
//! │  loop (sync) │◀────INBOUND─────│  (async)     │◀── (MQTT, log)
//! └──────────────┘  InboundCommand  └──────────────┘
//! ```

pub mod channels;
pub mod io_task;
pub mod payload;
pub mod topics;
