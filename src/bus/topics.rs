//! Topic names composed from the configured segments.

use core::fmt::Write as _;

use super::channels::Topic;
use crate::config::TopicConfig;
use crate::error::{Error, Result};

/// Fully qualified topics, built once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// `<root>/<device>/<status>`: full snapshot.
    pub status: Topic,
    /// `<root>/<device>/<heater_status>`: induction record only.
    pub heater_status: Topic,
    /// `<root>/<device>/<heater_command>`: inbound power level.
    pub heater_command: Topic,
}

fn compose(cfg: &TopicConfig, leaf: &str) -> Result<Topic> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}/{}", cfg.root, cfg.device, leaf).map_err(|_| Error::Config("topic too long"))?;
    Ok(topic)
}

impl Topics {
    pub fn from_config(cfg: &TopicConfig) -> Result<Self> {
        Ok(Self {
            status: compose(cfg, &cfg.status)?,
            heater_status: compose(cfg, &cfg.heater_status)?,
            heater_command: compose(cfg, &cfg.heater_command)?,
        })
    }

    /// Whether an inbound message is a heater power command.
    pub fn is_heater_command(&self, topic: &str) -> bool {
        topic == self.heater_command.as_str()
    }
}
