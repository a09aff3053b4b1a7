//! Bus inter-task communication channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the async bus I/O
//! thread with the synchronous scheduler loop. Both sides share these
//! static channels without heap allocation. The loop side only ever uses
//! `try_send`/`try_receive`, so a stalled network never blocks it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

pub const TOPIC_CAPACITY: usize = 80;

/// Large enough for a full snapshot with every sensor slot populated.
pub const PAYLOAD_CAPACITY: usize = 2048;

/// Inbound payloads are a single power level.
pub const COMMAND_CAPACITY: usize = 64;

pub type Topic = String<TOPIC_CAPACITY>;
pub type Payload = String<PAYLOAD_CAPACITY>;

/// Outbound message from the scheduler loop, delivered to the I/O thread.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: Topic,
    pub payload: Payload,
}

/// Inbound command received by the bus client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub topic: Topic,
    pub payload: String<COMMAND_CAPACITY>,
}

const OUTBOUND_DEPTH: usize = 4;
const INBOUND_DEPTH: usize = 4;

pub type OutboundChannel = Channel<CriticalSectionRawMutex, BusMessage, OUTBOUND_DEPTH>;
pub type InboundChannel = Channel<CriticalSectionRawMutex, InboundCommand, INBOUND_DEPTH>;

/// Telemetry: scheduler loop → I/O thread.
pub static OUTBOUND: OutboundChannel = Channel::new();

/// Commands: I/O thread → scheduler loop.
pub static INBOUND: InboundChannel = Channel::new();
