use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::{error, info, trace};

use crate::drivers::Publisher;
use crate::error::ProcessorError;
use crate::store::ChannelPriorityStore;

/// Default interval between readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling delivery loop, one per process: releases messages whose priority
/// timestamp has passed and forwards them to the destination publisher.
/// Deliberately a poll over `{check-cancel, check-ready, act-or-sleep}`
/// rather than a notification hook into the replication substrate — delivery
/// latency is bounded by the interval, and termination and timing stay
/// directly testable.
pub struct DeliveryProcessor {
    store: Arc<ChannelPriorityStore>,
    publisher: Arc<dyn Publisher>,
    cancel: Receiver<()>,
    poll_interval: Duration,
}

impl DeliveryProcessor {
    pub fn new(
        store: Arc<ChannelPriorityStore>,
        publisher: Arc<dyn Publisher>,
        cancel: Receiver<()>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            cancel,
            poll_interval,
        }
    }

    /// Run until cancelled or a publish fails. Cancellation — a signal on the
    /// cancel channel or its senders dropping — returns `Ok` within one poll
    /// interval. A publish failure is fatal: the message already left the
    /// store and is not restored, so that path loses the message.
    pub fn run(&self) -> Result<(), ProcessorError> {
        info!("delivery processor started");
        loop {
            match self.cancel.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    info!("delivery processor stopped");
                    return Ok(());
                }
                Err(TryRecvError::Empty) => {}
            }

            let now = unix_now();
            if self.store.check_scheduled(now) {
                let Some(message) = self.store.dequeue() else {
                    continue;
                };
                let priority = message.priority;
                trace!(priority, now, "message ready for delivery");
                if let Err(e) = self.publisher.push(message) {
                    error!(priority, now, error = %e, "message publish failed");
                    return Err(ProcessorError::Publish(e));
                }
                trace!(priority, now, "message published");
            } else {
                // Park on the cancel channel so a shutdown wakes the loop
                // immediately instead of after a full sleep.
                match self.cancel.recv_timeout(self.poll_interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!("delivery processor stopped");
                        return Ok(());
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
    }
}

/// Wall-clock unix seconds. Delivery readiness is a node-local decision; the
/// replicated reducer never reads this.
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
