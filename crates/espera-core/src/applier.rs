use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::channel::Channel;
use crate::cluster::CommandLog;
use crate::error::PersistError;
use crate::fsm::{ApplyOutcome, Command};
use crate::message::Message;

/// Turns caller intents into serialized commands on the replicated log and
/// hands back exactly what the substrate and reducer reported. No retry lives
/// here: a timed-out submission may still commit later, so the retry decision
/// — and its double-application risk — belongs to the caller.
pub struct CommandApplier {
    log: Arc<dyn CommandLog>,
    submit_timeout: Duration,
}

impl CommandApplier {
    /// Attach to a replication substrate. Leadership is not validated here;
    /// the substrate checks it on every submission.
    pub fn new(log: Arc<dyn CommandLog>, submit_timeout: Duration) -> Self {
        Self {
            log,
            submit_timeout,
        }
    }

    /// Replicate one message into a channel's queue.
    pub fn persist(&self, message: Message, channel_id: &str) -> Result<(), PersistError> {
        debug!(%channel_id, priority = message.priority, "persisting message");
        self.submit(&Command::MessagePush {
            channel_id: channel_id.to_string(),
            message,
        })?;
        Ok(())
    }

    /// Replicate one message into the legacy flat queue.
    pub fn persist_flat(&self, message: Message) -> Result<(), PersistError> {
        debug!(priority = message.priority, "persisting message (flat mode)");
        self.submit(&Command::LegacyPush { message })?;
        Ok(())
    }

    /// Replicate a channel registration and return the created channel.
    pub fn create_channel(&self, channel: Channel) -> Result<Channel, PersistError> {
        debug!(channel_id = %channel.id, "creating channel");
        match self.submit(&Command::ChannelCreate { channel })? {
            ApplyOutcome::ChannelCreated(created) => Ok(created),
            _ => Err(PersistError::UnexpectedOutcome),
        }
    }

    fn submit(&self, command: &Command) -> Result<ApplyOutcome, PersistError> {
        let payload = command
            .encode()
            .map_err(|e| PersistError::Encode(e.to_string()))?;
        let result = self.log.submit(payload, self.submit_timeout)?;
        Ok(result?)
    }
}
