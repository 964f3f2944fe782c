use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::info;

use crate::cluster::CommandLog;
use crate::error::{ClusterError, SubmitError};
use crate::fsm::{ApplyResult, StateMachine};

/// One submitted command plus its reply slot.
enum LogEntry {
    Apply {
        payload: Vec<u8>,
        reply: Sender<ApplyResult>,
    },
    Shutdown,
}

/// Single-node, in-process command log. The log IS the bounded command
/// channel: its FIFO order is the total order, and a dedicated apply thread
/// drains it and drives the state machine strictly sequentially — the same
/// delivery contract a multi-node consensus substrate provides to each
/// replica. Used by the server binary for single-node operation and by every
/// test as the substrate stand-in.
pub struct LocalLog {
    entry_tx: Sender<LogEntry>,
    leader: AtomicBool,
    apply_thread: Option<thread::JoinHandle<()>>,
}

impl LocalLog {
    /// Spawn the apply thread over the given state machine.
    pub fn new(fsm: Arc<dyn StateMachine>, capacity: usize) -> Result<Self, ClusterError> {
        let (entry_tx, entry_rx) = bounded::<LogEntry>(capacity);

        let handle = thread::Builder::new()
            .name("espera-apply".to_string())
            .spawn(move || apply_loop(fsm, entry_rx))
            .map_err(|e| ClusterError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            entry_tx,
            leader: AtomicBool::new(true),
            apply_thread: Some(handle),
        })
    }

    /// Make submissions fail with `NotLeader` until [`promote`] is called.
    /// Leadership is checked per submission, never at attach time.
    ///
    /// [`promote`]: LocalLog::promote
    pub fn demote(&self) {
        self.leader.store(false, Ordering::Release);
    }

    pub fn promote(&self) {
        self.leader.store(true, Ordering::Release);
    }

    /// Stop the apply thread and wait for it to drain.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.apply_thread.take() {
            let _ = self.entry_tx.send(LogEntry::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for LocalLog {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CommandLog for LocalLog {
    fn submit(&self, payload: Vec<u8>, timeout: Duration) -> Result<ApplyResult, SubmitError> {
        if !self.leader.load(Ordering::Acquire) {
            return Err(SubmitError::NotLeader);
        }

        let deadline = Instant::now() + timeout;
        let (reply_tx, reply_rx) = bounded(1);

        self.entry_tx
            .send_timeout(
                LogEntry::Apply {
                    payload,
                    reply: reply_tx,
                },
                timeout,
            )
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SubmitError::Timeout,
                SendTimeoutError::Disconnected(_) => {
                    SubmitError::Unavailable("log service stopped".to_string())
                }
            })?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        match reply_rx.recv_timeout(remaining) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(SubmitError::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SubmitError::Unavailable("log service stopped".to_string()))
            }
        }
    }
}

fn apply_loop(fsm: Arc<dyn StateMachine>, entry_rx: Receiver<LogEntry>) {
    info!("apply loop started");
    while let Ok(entry) = entry_rx.recv() {
        match entry {
            LogEntry::Apply { payload, reply } => {
                // Submitter may have timed out and gone away; the command is
                // committed either way.
                let _ = reply.send(fsm.apply(&payload));
            }
            LogEntry::Shutdown => break,
        }
    }
    info!("apply loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::channel::Channel;
    use crate::error::ApplyError;
    use crate::fsm::{ApplyOutcome, Command, PrioritizedStateMachine};
    use crate::message::Message;
    use crate::store::ChannelPriorityStore;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn test_log() -> (LocalLog, Arc<ChannelPriorityStore>) {
        let store = Arc::new(ChannelPriorityStore::new());
        let fsm = Arc::new(PrioritizedStateMachine::new(Arc::clone(&store)));
        let log = LocalLog::new(fsm, 64).unwrap();
        (log, store)
    }

    #[test]
    fn submit_applies_command_and_returns_outcome() {
        let (log, store) = test_log();

        let payload = Command::ChannelCreate {
            channel: Channel::new("ch1"),
        }
        .encode()
        .unwrap();
        let outcome = log.submit(payload, TIMEOUT).unwrap().unwrap();
        assert_eq!(outcome, ApplyOutcome::ChannelCreated(Channel::new("ch1")));

        let (channels, _) = store.dump();
        assert_eq!(channels, vec![Channel::new("ch1")]);
    }

    #[test]
    fn submissions_apply_in_fifo_order() {
        let (log, store) = test_log();

        let payload = Command::ChannelCreate {
            channel: Channel::new("ch1"),
        }
        .encode()
        .unwrap();
        log.submit(payload, TIMEOUT).unwrap().unwrap();

        for (value, priority) in [("first", 500), ("second", 500), ("third", 500)] {
            let payload = Command::MessagePush {
                channel_id: "ch1".to_string(),
                message: Message::new(value, priority),
            }
            .encode()
            .unwrap();
            log.submit(payload, TIMEOUT).unwrap().unwrap();
        }

        assert_eq!(store.dequeue().unwrap().value, "first");
        assert_eq!(store.dequeue().unwrap().value, "second");
        assert_eq!(store.dequeue().unwrap().value, "third");
    }

    #[test]
    fn reducer_errors_come_back_as_values() {
        let (log, _store) = test_log();

        let result = log.submit(b"garbage".to_vec(), TIMEOUT).unwrap();
        assert!(matches!(result, Err(ApplyError::Decode(_))));
    }

    #[test]
    fn demoted_node_refuses_submissions() {
        let (log, store) = test_log();
        log.demote();

        let payload = Command::LegacyPush {
            message: Message::new("msg1", 1000),
        }
        .encode()
        .unwrap();
        assert_eq!(
            log.submit(payload.clone(), TIMEOUT).unwrap_err(),
            SubmitError::NotLeader
        );
        assert!(store.is_empty());

        log.promote();
        log.submit(payload, TIMEOUT).unwrap().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn slow_apply_times_out_within_bounded_wait() {
        struct SlowMachine;

        impl StateMachine for SlowMachine {
            fn apply(&self, _command: &[u8]) -> ApplyResult {
                thread::sleep(Duration::from_millis(500));
                Ok(ApplyOutcome::Enqueued)
            }
            fn snapshot(&self) -> Result<Vec<u8>, crate::error::SnapshotError> {
                Ok(Vec::new())
            }
            fn restore(&self, _data: &[u8]) -> Result<(), crate::error::SnapshotError> {
                Ok(())
            }
        }

        let log = LocalLog::new(Arc::new(SlowMachine), 64).unwrap();
        let started = Instant::now();
        let err = log
            .submit(b"{}".to_vec(), Duration::from_millis(50))
            .unwrap_err();
        assert_eq!(err, SubmitError::Timeout);
        assert!(
            started.elapsed() < Duration::from_millis(400),
            "submit must give up at the deadline, not wait for the apply"
        );
    }

    #[test]
    fn shutdown_stops_the_apply_thread() {
        let (log, _store) = test_log();
        let entry_tx = log.entry_tx.clone();
        log.shutdown();

        // Apply thread gone: the channel reports disconnection to any
        // remaining handle.
        assert!(entry_tx.send(LogEntry::Shutdown).is_err());
    }
}
