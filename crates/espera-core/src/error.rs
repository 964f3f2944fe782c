/// Domain errors raised by the channel priority store. These travel back to
/// the command submitter inside an `ApplyResult`; the store is left unchanged
/// whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("channel already exists: {0}")]
    DuplicateChannel(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}

/// Reducer-level failures. Deterministic for a given input: every replica
/// resolves the same command bytes to the same `ApplyError`, which keeps
/// state convergent — a failed apply is a normal outcome, never a crash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("malformed command: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Snapshot capture/restore failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding error: {0}")]
    Encode(String),

    #[error("snapshot decoding error: {0}")]
    Decode(String),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the replication substrate at submission time. No retry
/// is attempted anywhere below the caller: a timed-out submission may still
/// commit after the deadline, so retrying risks double application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("node is not the cluster leader")]
    NotLeader,

    #[error("command submission timed out")]
    Timeout,

    #[error("replication substrate unavailable: {0}")]
    Unavailable(String),
}

/// Failures booting the in-process log service.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("failed to spawn apply thread: {0}")]
    SpawnFailed(String),
}

/// Submission-path failures seen by callers of the command applier: the
/// command could not be encoded, the substrate rejected it, or the reducer
/// did.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("command encoding error: {0}")]
    Encode(String),

    #[error("unexpected apply outcome for command")]
    UnexpectedOutcome,

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Errors from resolving or booting a source/destination driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("invalid driver config: {0}")]
    InvalidConfig(String),

    #[error("driver terminated: {0}")]
    Terminated(String),
}

/// Outbound publish failure reported by a destination driver. The returned
/// error is the publisher's only acknowledgment channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// Fatal errors terminating the delivery processor loop. By the time a
/// publish fails the message has already left the store, so this is an
/// acknowledged at-most-once loss point rather than a recoverable condition.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Publish(#[from] PublishError),
}
