use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{info, trace};

use super::{
    extract_priority, Listener, Publisher, RawDelivery, SinkDriver, SourceDriver,
    AVAILABLE_AT_ATTRIBUTE,
};
use crate::error::{DriverError, PublishError};
use crate::message::Message;

/// Capacity of each topic bus.
const TOPIC_CAPACITY: usize = 1024;

/// How long a listener parks on its topic before re-checking cancellation.
const RECEIVE_POLL: Duration = Duration::from_millis(100);

/// Driver-specific config: which topic on the hub to attach to.
#[derive(Debug, Deserialize)]
struct MemoryConfig {
    topic: String,
}

/// In-process topic hub: named bounded buses of raw deliveries. One hub is
/// shared by every memory source and sink in the process, making it the
/// reference transport for tests and single-node runs.
#[derive(Default)]
pub struct MemoryHub {
    topics: Mutex<HashMap<String, (Sender<RawDelivery>, Receiver<RawDelivery>)>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, name: &str) -> (Sender<RawDelivery>, Receiver<RawDelivery>) {
        let mut topics = self.topics.lock();
        topics
            .entry(name.to_string())
            .or_insert_with(|| bounded(TOPIC_CAPACITY))
            .clone()
    }

    /// Publish a raw delivery onto a topic (the producer side).
    pub fn send(&self, topic: &str, delivery: RawDelivery) -> Result<(), PublishError> {
        let (tx, _) = self.topic(topic);
        tx.try_send(delivery)
            .map_err(|e| PublishError(e.to_string()))
    }

    /// Drain whatever is currently buffered on a topic (the consumer side).
    pub fn drain(&self, topic: &str) -> Vec<RawDelivery> {
        let (_, rx) = self.topic(topic);
        rx.try_iter().collect()
    }
}

/// Boots memory listeners and publishers from `{ "topic": ... }` descriptors.
pub struct MemoryDriver {
    hub: Arc<MemoryHub>,
}

impl MemoryDriver {
    pub fn new(hub: Arc<MemoryHub>) -> Self {
        Self { hub }
    }

    fn parse_config(config: &serde_json::Value) -> Result<MemoryConfig, DriverError> {
        serde_json::from_value(config.clone()).map_err(|e| DriverError::InvalidConfig(e.to_string()))
    }
}

impl SourceDriver for MemoryDriver {
    fn boot(&self, config: &serde_json::Value) -> Result<Box<dyn Listener>, DriverError> {
        let config = Self::parse_config(config)?;
        let (_, rx) = self.hub.topic(&config.topic);
        Ok(Box::new(MemoryListener {
            topic: config.topic,
            rx,
        }))
    }
}

impl SinkDriver for MemoryDriver {
    fn boot(&self, config: &serde_json::Value) -> Result<Arc<dyn Publisher>, DriverError> {
        let config = Self::parse_config(config)?;
        let (tx, _) = self.hub.topic(&config.topic);
        Ok(Arc::new(MemoryPublisher {
            topic: config.topic,
            tx,
        }))
    }
}

struct MemoryListener {
    topic: String,
    rx: Receiver<RawDelivery>,
}

impl Listener for MemoryListener {
    /// Receive raw deliveries, apply the priority-extraction contract, and
    /// forward `(value, priority)` pairs. Deliveries failing extraction are
    /// dropped (already logged); the loop ends on cancellation or when the
    /// ingest side goes away.
    fn listen(&mut self, inbound: Sender<Message>, cancel: Receiver<()>) -> Result<(), DriverError> {
        info!(topic = %self.topic, "memory listener started");
        loop {
            match cancel.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match self.rx.recv_timeout(RECEIVE_POLL) {
                Ok(delivery) => {
                    trace!(topic = %self.topic, data = %delivery.data, "listener delivery received");
                    let Some(priority) = extract_priority(&delivery) else {
                        continue;
                    };
                    if inbound.send(Message::new(delivery.data, priority)).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!(topic = %self.topic, "memory listener stopped");
        Ok(())
    }
}

struct MemoryPublisher {
    topic: String,
    tx: Sender<RawDelivery>,
}

impl Publisher for MemoryPublisher {
    /// Re-emit the message with its original `available_at` attribute so a
    /// downstream consumer sees the same contract this scheduler consumed.
    fn push(&self, message: Message) -> Result<(), PublishError> {
        let delivery = RawDelivery {
            data: message.value,
            attributes: HashMap::from([(
                AVAILABLE_AT_ATTRIBUTE.to_string(),
                message.priority.to_string(),
            )]),
        };
        self.tx.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => PublishError(format!("memory topic {} is full", self.topic)),
            TrySendError::Disconnected(_) => {
                PublishError(format!("memory topic {} is closed", self.topic))
            }
        })
    }
}
