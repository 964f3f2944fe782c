mod local;

pub use local::LocalLog;

use std::time::Duration;

use crate::error::SubmitError;
use crate::fsm::ApplyResult;

/// Narrow seam to the replication substrate. A compliant implementation
/// delivers every submitted command to `StateMachine::apply` exactly once on
/// every replica, sequentially and in one total order, after majority commit,
/// and returns that replica-identical `ApplyResult` to the submitter. Leader
/// election, log replication, and quorum tracking all live behind this trait.
pub trait CommandLog: Send + Sync {
    /// Submit a serialized command with a bounded wait. Past the deadline the
    /// call returns `SubmitError::Timeout` without knowing whether the
    /// command ultimately committed — which is why no layer below the caller
    /// retries.
    fn submit(&self, payload: Vec<u8>, timeout: Duration) -> Result<ApplyResult, SubmitError>;
}
