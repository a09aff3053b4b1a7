//! Publish adapter — queues telemetry for the bus I/O thread.

use crate::app::ports::PublishPort;
use crate::bus::channels::{BusMessage, OUTBOUND, OutboundChannel};
use crate::error::PublishError;

/// Hands messages to the outbound channel without ever waiting.
pub struct QueuedPublisher<'a> {
    channel: &'a OutboundChannel,
}

impl QueuedPublisher<'static> {
    /// Publisher on the shared outbound channel.
    pub fn new() -> Self {
        Self { channel: &OUTBOUND }
    }
}

impl Default for QueuedPublisher<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> QueuedPublisher<'a> {
    pub fn with_channel(channel: &'a OutboundChannel) -> Self {
        Self { channel }
    }
}

impl PublishPort for QueuedPublisher<'_> {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let msg = BusMessage {
            topic: topic.try_into().map_err(|()| PublishError::TooLarge)?,
            payload: payload.try_into().map_err(|()| PublishError::TooLarge)?,
        };
        self.channel.try_send(msg).map_err(|_| PublishError::Unavailable)
    }
}
