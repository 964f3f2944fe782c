use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::ApplyError;
use crate::message::Message;

/// A single replicated mutation intent. Commands are the only write path into
/// the store; the reducer decodes and applies them in committed log order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    ChannelCreate {
        channel: Channel,
    },
    MessagePush {
        channel_id: String,
        message: Message,
    },
    /// Pre-channel compatibility: push into the store's flat queue.
    LegacyPush {
        message: Message,
    },
}

impl Command {
    /// Encode for submission to the replicated log.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a committed log entry. Failure is a deterministic value — the
    /// same bytes decode to the same error on every replica.
    pub fn decode(data: &[u8]) -> Result<Self, ApplyError> {
        serde_json::from_slice(data).map_err(|e| ApplyError::Decode(e.to_string()))
    }
}

/// Typed payload of one successfully applied command, carried back to the
/// submitter.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    ChannelCreated(Channel),
    Enqueued,
}

/// Per-command result returned to the submitter once the command committed.
pub type ApplyResult = Result<ApplyOutcome, ApplyError>;
