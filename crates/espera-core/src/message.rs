use serde::{Deserialize, Serialize};

/// Core message domain type carried through commands, snapshots, and the
/// delivery path. `priority` is the unix-seconds timestamp at which the
/// message becomes eligible for delivery; lower values are dequeued first,
/// and equal priorities leave in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub value: String,
    pub priority: i64,
}

impl Message {
    pub fn new(value: impl Into<String>, priority: i64) -> Self {
        Self {
            value: value.into(),
            priority,
        }
    }
}
