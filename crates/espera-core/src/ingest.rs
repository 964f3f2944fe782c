use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{error, info, trace};

use crate::applier::CommandApplier;
use crate::message::Message;

/// Where ingested messages land: a named channel, or the legacy flat queue
/// for pre-channel deployments.
#[derive(Debug, Clone)]
pub enum IngestTarget {
    Channel(String),
    Flat,
}

/// Pump between a listener's inbound channel and the command applier: drains
/// `(value, priority)` messages and replicates each one. A failed submission
/// is logged and the message dropped — command failures are per-submission
/// outcomes, not process faults.
pub struct IngestPump {
    applier: Arc<CommandApplier>,
    inbound: Receiver<Message>,
    target: IngestTarget,
}

impl IngestPump {
    pub fn new(
        applier: Arc<CommandApplier>,
        inbound: Receiver<Message>,
        target: IngestTarget,
    ) -> Self {
        Self {
            applier,
            inbound,
            target,
        }
    }

    /// Run until every inbound sender is gone — the listener drops its sender
    /// on cancellation, which ends this loop with it.
    pub fn run(&self) {
        info!("ingest pump started");
        for message in self.inbound.iter() {
            trace!(priority = message.priority, "ingesting message");
            let result = match &self.target {
                IngestTarget::Channel(id) => self.applier.persist(message, id),
                IngestTarget::Flat => self.applier.persist_flat(message),
            };
            if let Err(e) = result {
                error!(error = %e, "message persist failed");
            }
        }
        info!("ingest pump stopped");
    }
}
