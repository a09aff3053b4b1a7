//! Log-based bus client.
//!
//! Implements [`BusClient`] by writing every outbound message to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production). Used when
//! no network client is wired; an MQTT adapter would implement the same
//! trait.

use log::info;

use crate::bus::channels::InboundCommand;
use crate::bus::io_task::BusClient;
use crate::error::PublishError;

/// Adapter that logs every message to the serial console.
#[derive(Debug, Default)]
pub struct LogBusClient {
    sent: u64,
}

impl LogBusClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl BusClient for LogBusClient {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.sent += 1;
        info!("BUS | {} | {}", topic, payload);
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<InboundCommand> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_messages_and_never_receives() {
        let mut c = LogBusClient::new();
        assert_eq!(c.publish("root/brewery/heater", "{}"), Ok(()));
        assert_eq!(c.sent(), 1);
        assert!(c.poll_inbound().is_none());
    }
}
