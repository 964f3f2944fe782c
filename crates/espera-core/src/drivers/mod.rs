mod memory;

pub use memory::{MemoryDriver, MemoryHub};

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::error;

use crate::channel::{DestinationSpec, SourceSpec};
use crate::error::{DriverError, PublishError};
use crate::message::Message;

/// Message attribute carrying the delivery timestamp.
pub const AVAILABLE_AT_ATTRIBUTE: &str = "available_at";

/// A raw inbound delivery before priority extraction: opaque payload plus
/// string attributes from the source bus.
#[derive(Debug, Clone, Default)]
pub struct RawDelivery {
    pub data: String,
    pub attributes: HashMap<String, String>,
}

impl RawDelivery {
    /// Delivery already carrying a valid `available_at` attribute.
    pub fn scheduled(data: impl Into<String>, available_at: i64) -> Self {
        Self {
            data: data.into(),
            attributes: HashMap::from([(
                AVAILABLE_AT_ATTRIBUTE.to_string(),
                available_at.to_string(),
            )]),
        }
    }
}

/// Extract the scheduling priority from a raw delivery. A delivery missing
/// the `available_at` attribute, or carrying an unparsable value, yields
/// `None`: the caller drops it with the error already logged here — never
/// queued, never retried.
pub fn extract_priority(delivery: &RawDelivery) -> Option<i64> {
    let Some(available_at) = delivery.attributes.get(AVAILABLE_AT_ATTRIBUTE) else {
        error!("listener delivery missing available_at attribute, dropping");
        return None;
    };
    match available_at.parse::<i64>() {
        Ok(priority) => Some(priority),
        Err(e) => {
            error!(%available_at, error = %e, "listener unable to read available_at attribute, dropping");
            None
        }
    }
}

/// Inbound capability of a booted source driver. `listen` blocks, feeding
/// extracted `(value, priority)` messages into `inbound` until the cancel
/// channel signals (or its senders drop) or the source terminates.
pub trait Listener: Send {
    fn listen(&mut self, inbound: Sender<Message>, cancel: Receiver<()>) -> Result<(), DriverError>;
}

/// Outbound capability of a booted destination driver. Must be safe to call
/// repeatedly and independently per message; the returned error is the only
/// acknowledgment it provides.
pub trait Publisher: Send + Sync {
    fn push(&self, message: Message) -> Result<(), PublishError>;
}

/// Boots listener instances for one named source driver.
pub trait SourceDriver: Send + Sync {
    fn boot(&self, config: &serde_json::Value) -> Result<Box<dyn Listener>, DriverError>;
}

/// Boots publisher instances for one named destination driver.
pub trait SinkDriver: Send + Sync {
    fn boot(&self, config: &serde_json::Value) -> Result<Arc<dyn Publisher>, DriverError>;
}

/// Name-indexed registry of driver implementations. Channel descriptors
/// select their drivers by name; resolution happens once at boot, not per
/// message.
#[derive(Default)]
pub struct DriverRegistry {
    sources: HashMap<String, Arc<dyn SourceDriver>>,
    sinks: HashMap<String, Arc<dyn SinkDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in `memory` driver bound to `hub`.
    pub fn with_memory(hub: Arc<MemoryHub>) -> Self {
        let mut registry = Self::new();
        let driver = Arc::new(MemoryDriver::new(hub));
        registry.register_source("memory", Arc::clone(&driver) as Arc<dyn SourceDriver>);
        registry.register_sink("memory", driver);
        registry
    }

    pub fn register_source(&mut self, name: &str, driver: Arc<dyn SourceDriver>) {
        self.sources.insert(name.to_string(), driver);
    }

    pub fn register_sink(&mut self, name: &str, driver: Arc<dyn SinkDriver>) {
        self.sinks.insert(name.to_string(), driver);
    }

    /// Boot a listener for a channel's source descriptor.
    pub fn listener(&self, spec: &SourceSpec) -> Result<Box<dyn Listener>, DriverError> {
        self.sources
            .get(&spec.driver)
            .ok_or_else(|| DriverError::UnknownDriver(spec.driver.clone()))?
            .boot(&spec.config)
    }

    /// Boot a publisher for a channel's destination descriptor.
    pub fn publisher(&self, spec: &DestinationSpec) -> Result<Arc<dyn Publisher>, DriverError> {
        self.sinks
            .get(&spec.driver)
            .ok_or_else(|| DriverError::UnknownDriver(spec.driver.clone()))?
            .boot(&spec.config)
    }
}
