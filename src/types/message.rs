use serde::{Deserialize, Serialize};

use crate::types::record::ErrorRecord;

/// Wire envelope for the persistent channel.
///
/// The collector consumes `error` events carrying a record and replies with
/// `ack` events; `heartbeat` events are liveness probes with an empty payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayMessage {
    pub event: RelayEvent,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayEvent {
    Error,
    Heartbeat,
    Ack,
}

impl RelayMessage {
    /// Wraps a record for transmission. Serialization of a record cannot fail;
    /// a defect there degrades to a null payload rather than a lost event.
    pub fn error(record: &ErrorRecord) -> Self {
        Self {
            event: RelayEvent::Error,
            payload: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn heartbeat() -> Self {
        Self {
            event: RelayEvent::Heartbeat,
            payload: serde_json::Value::Null,
        }
    }
}
