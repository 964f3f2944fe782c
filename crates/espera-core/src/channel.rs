use serde::{Deserialize, Serialize};

/// A named logical queue with its own source and destination driver
/// configuration. A channel is registered once via a replicated
/// `ChannelCreate` command, lives for the cluster's process lifetime, is
/// never mutated, and disappears only when the store is flushed for a
/// restore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub source: SourceSpec,
    #[serde(default)]
    pub destination: DestinationSpec,
}

impl Channel {
    /// Channel with empty driver descriptors; tests and flat-mode migrations
    /// fill the drivers in later or never.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: SourceSpec::default(),
            destination: DestinationSpec::default(),
        }
    }
}

/// Inbound driver descriptor: a driver name resolved against the registry at
/// boot, plus driver-specific config kept as opaque JSON so descriptors
/// round-trip through commands and snapshots without the core knowing driver
/// internals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceSpec {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Outbound driver descriptor; same shape and rules as [`SourceSpec`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DestinationSpec {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub config: serde_json::Value,
}
