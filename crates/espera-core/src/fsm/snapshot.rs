use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::SnapshotError;
use crate::message::Message;

/// Point-in-time capture of the full store: every channel descriptor plus
/// each channel's queued messages in dequeue order (the flat queue under the
/// reserved empty id). Restoring re-inserts the lists sequentially, which
/// reproduces the exact pre-snapshot dequeue sequence; the encoding only has
/// to round-trip semantics, not bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSnapshot {
    pub channels: Vec<Channel>,
    pub messages_by_channel: HashMap<String, Vec<Message>>,
}

impl StoreSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, SnapshotError> {
        serde_json::from_slice(data).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}
