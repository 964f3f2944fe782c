mod command;
mod snapshot;

#[cfg(test)]
mod tests;

pub use command::{ApplyOutcome, ApplyResult, Command};
pub use snapshot::StoreSnapshot;

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::store::{ChannelPriorityStore, FLAT_QUEUE_ID};

/// Capability set the replication substrate drives. `apply` must be
/// deterministic: no wall clock, randomness, or node identity — the same
/// committed command sequence produces the same state on every replica.
pub trait StateMachine: Send + Sync {
    /// Apply one committed command. Failures are returned as values: a
    /// malformed or rejected command resolves to the identical error on every
    /// replica and never crashes the process.
    fn apply(&self, command: &[u8]) -> ApplyResult;

    /// Consistent capture of the full state as of the call. Safe to invoke
    /// concurrently with in-flight `apply` calls — the substrate does exactly
    /// that during log compaction.
    fn snapshot(&self) -> Result<Vec<u8>, SnapshotError>;

    /// Replace the current state with a decoded snapshot.
    fn restore(&self, data: &[u8]) -> Result<(), SnapshotError>;
}

/// The scheduler's reducer: decodes replicated commands and folds them into
/// the channel priority store.
pub struct PrioritizedStateMachine {
    store: Arc<ChannelPriorityStore>,
}

impl PrioritizedStateMachine {
    pub fn new(store: Arc<ChannelPriorityStore>) -> Self {
        Self { store }
    }
}

impl StateMachine for PrioritizedStateMachine {
    fn apply(&self, command: &[u8]) -> ApplyResult {
        match Command::decode(command)? {
            Command::ChannelCreate { channel } => {
                debug!(channel_id = %channel.id, "applying channel create");
                let created = self.store.add_channel(channel)?;
                Ok(ApplyOutcome::ChannelCreated(created))
            }
            Command::MessagePush {
                channel_id,
                message,
            } => {
                debug!(%channel_id, priority = message.priority, "applying message push");
                self.store.enqueue(&channel_id, message)?;
                Ok(ApplyOutcome::Enqueued)
            }
            Command::LegacyPush { message } => {
                debug!(priority = message.priority, "applying legacy push");
                self.store.enqueue_flat(message);
                Ok(ApplyOutcome::Enqueued)
            }
        }
    }

    fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let (channels, messages_by_channel) = self.store.dump();
        StoreSnapshot {
            channels,
            messages_by_channel,
        }
        .encode()
    }

    fn restore(&self, data: &[u8]) -> Result<(), SnapshotError> {
        let StoreSnapshot {
            channels,
            mut messages_by_channel,
        } = StoreSnapshot::decode(data)?;

        self.store.flush();

        let channel_count = channels.len();
        let mut message_count = 0usize;
        for channel in channels {
            let id = channel.id.clone();
            self.store
                .add_channel(channel)
                .map_err(|e| SnapshotError::Corrupt(e.to_string()))?;
            for message in messages_by_channel.remove(&id).unwrap_or_default() {
                self.store
                    .enqueue(&id, message)
                    .map_err(|e| SnapshotError::Corrupt(e.to_string()))?;
                message_count += 1;
            }
        }

        for message in messages_by_channel
            .remove(FLAT_QUEUE_ID)
            .unwrap_or_default()
        {
            self.store.enqueue_flat(message);
            message_count += 1;
        }

        if let Some(id) = messages_by_channel.into_keys().next() {
            return Err(SnapshotError::Corrupt(format!(
                "messages recorded for unknown channel: {id}"
            )));
        }

        info!(channels = channel_count, messages = message_count, "snapshot restored");
        Ok(())
    }
}
