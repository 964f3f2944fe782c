mod queue;

pub use queue::ChannelQueue;

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::channel::Channel;
use crate::error::StoreError;
use crate::message::Message;

/// Reserved id under which the legacy flat queue appears in dumps and
/// snapshots. No channel registration uses the empty id.
pub const FLAT_QUEUE_ID: &str = "";

#[derive(Debug, Default)]
struct StoreState {
    /// Registration-ordered channel descriptors.
    channels: Vec<Channel>,
    queues: HashMap<String, ChannelQueue>,
    /// Legacy flat mode: one global queue, no channels. Mutually exclusive
    /// with per-channel use for a given store instance.
    flat: ChannelQueue,
    /// Store-wide arrival counter for the FIFO tie-break. Assigned under the
    /// lock in replicated-log order, so it is identical on every replica.
    seq: u64,
}

impl StoreState {
    /// Minimum `(priority, seq)` key across the flat queue and every channel.
    fn min_key(&self) -> Option<(i64, u64)> {
        let mut best = self.flat.peek_key();
        for queue in self.queues.values() {
            if let Some(key) = queue.peek_key() {
                if best.map_or(true, |b| key < b) {
                    best = Some(key);
                }
            }
        }
        best
    }

    /// Scope holding the minimum key: `Some(None)` for the flat queue,
    /// `Some(Some(id))` for a channel, `None` when the store is empty.
    /// Unambiguous because the arrival counter never repeats.
    fn min_scope(&self) -> Option<Option<String>> {
        let mut best: Option<((i64, u64), Option<String>)> =
            self.flat.peek_key().map(|key| (key, None));
        for (id, queue) in &self.queues {
            if let Some(key) = queue.peek_key() {
                if best.as_ref().map_or(true, |(b, _)| key < *b) {
                    best = Some((key, Some(id.clone())));
                }
            }
        }
        best.map(|(_, scope)| scope)
    }
}

/// Owns every channel and its priority queue. Pure in-memory state with one
/// store-wide mutex: the reducer's apply path (writer), snapshot capture
/// (reader), and the delivery processor (remover) each hold the lock for the
/// whole operation, so no observer ever sees a half-applied mutation.
#[derive(Debug, Default)]
pub struct ChannelPriorityStore {
    state: Mutex<StoreState>,
}

impl ChannelPriorityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel by id. Fails with `DuplicateChannel` when the id is
    /// taken; the store is untouched on failure.
    pub fn add_channel(&self, channel: Channel) -> Result<Channel, StoreError> {
        let mut state = self.state.lock();
        if state.queues.contains_key(&channel.id) {
            return Err(StoreError::DuplicateChannel(channel.id));
        }
        state.queues.insert(channel.id.clone(), ChannelQueue::new());
        state.channels.push(channel.clone());
        Ok(channel)
    }

    /// Dequeue-ordered view of one channel's queue — the channel-storage
    /// accessor. Fails with `ChannelNotFound` when the id is unknown.
    pub fn channel_messages(&self, id: &str) -> Result<Vec<Message>, StoreError> {
        let state = self.state.lock();
        state
            .queues
            .get(id)
            .map(ChannelQueue::to_vec)
            .ok_or_else(|| StoreError::ChannelNotFound(id.to_string()))
    }

    /// Insert into a channel's queue. An unknown channel id discards the
    /// message and reports `ChannelNotFound` — nothing is buffered.
    pub fn enqueue(&self, channel_id: &str, message: Message) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let seq = state.seq;
        match state.queues.get_mut(channel_id) {
            Some(queue) => queue.push(message, seq),
            None => return Err(StoreError::ChannelNotFound(channel_id.to_string())),
        }
        state.seq += 1;
        Ok(())
    }

    /// Legacy flat-mode insertion: one global queue, no channel required.
    pub fn enqueue_flat(&self, message: Message) {
        let mut state = self.state.lock();
        let seq = state.seq;
        state.flat.push(message, seq);
        state.seq += 1;
    }

    /// True when at least one queued message anywhere in the store is due at
    /// `now`. The frontier is the aggregate minimum across the flat queue and
    /// every channel.
    pub fn check_scheduled(&self, now: i64) -> bool {
        let state = self.state.lock();
        state.min_key().map_or(false, |(priority, _)| priority <= now)
    }

    /// Remove and return the store-wide minimum `(priority, seq)` message.
    /// `None` on an empty store; callers gate on [`check_scheduled`].
    ///
    /// [`check_scheduled`]: ChannelPriorityStore::check_scheduled
    pub fn dequeue(&self) -> Option<Message> {
        let mut state = self.state.lock();
        match state.min_scope()? {
            None => state.flat.pop(),
            Some(id) => state.queues.get_mut(&id).and_then(ChannelQueue::pop),
        }
    }

    /// Read-only export of the whole store: registration-ordered channels and
    /// dequeue-ordered messages per channel id, with the flat queue under
    /// [`FLAT_QUEUE_ID`] when non-empty. Content-equivalent to a snapshot
    /// capture and observed at a single instant.
    pub fn dump(&self) -> (Vec<Channel>, HashMap<String, Vec<Message>>) {
        let state = self.state.lock();
        let mut messages: HashMap<String, Vec<Message>> = state
            .queues
            .iter()
            .map(|(id, queue)| (id.clone(), queue.to_vec()))
            .collect();
        if !state.flat.is_empty() {
            messages.insert(FLAT_QUEUE_ID.to_string(), state.flat.to_vec());
        }
        (state.channels.clone(), messages)
    }

    /// Drop every channel and message and reset the arrival counter. Run
    /// before a snapshot restore to guarantee a clean target.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        *state = StoreState::default();
    }

    /// Total queued messages across the flat queue and every channel.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.flat.len() + state.queues.values().map(ChannelQueue::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
