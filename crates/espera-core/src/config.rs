use serde::Deserialize;

use crate::channel::Channel;

/// Top-level node configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EsperaConfig {
    pub cluster: ClusterConfig,
    pub processor: ProcessorConfig,
    /// Default channel registered at startup; ingestion targets it. Absent
    /// means the node boots with no channels and waits for `ChannelCreate`
    /// commands from the cluster.
    pub channel: Option<Channel>,
}

/// Replication-side tuning: command channel capacity and the bounded wait on
/// submissions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub command_channel_capacity: usize,
    pub submit_timeout_ms: u64,
}

/// Delivery loop tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub poll_interval_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 1024,
            submit_timeout_ms: 500,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = EsperaConfig::default();
        assert_eq!(config.cluster.command_channel_capacity, 1024);
        assert_eq!(config.cluster.submit_timeout_ms, 500);
        assert_eq!(config.processor.poll_interval_ms, 1_000);
        assert!(config.channel.is_none());
    }

    #[test]
    fn toml_parsing_with_overrides() {
        let toml_str = r#"
            [cluster]
            command_channel_capacity = 256
            submit_timeout_ms = 250

            [processor]
            poll_interval_ms = 100
        "#;
        let config: EsperaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cluster.command_channel_capacity, 256);
        assert_eq!(config.cluster.submit_timeout_ms, 250);
        assert_eq!(config.processor.poll_interval_ms, 100);
    }

    #[test]
    fn toml_parsing_empty_uses_defaults() {
        let config: EsperaConfig = toml::from_str("").unwrap();
        assert_eq!(config.cluster.command_channel_capacity, 1024);
        assert_eq!(config.processor.poll_interval_ms, 1_000);
    }

    #[test]
    fn toml_parsing_partial_config() {
        let toml_str = r#"
            [processor]
            poll_interval_ms = 50
        "#;
        let config: EsperaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.processor.poll_interval_ms, 50);
        // Cluster defaults preserved
        assert_eq!(config.cluster.submit_timeout_ms, 500);
    }

    #[test]
    fn toml_parsing_default_channel_descriptor() {
        let toml_str = r#"
            [channel]
            id = "default"

            [channel.source]
            driver = "memory"
            config = { topic = "inbound" }

            [channel.destination]
            driver = "memory"
            config = { topic = "outbound" }
        "#;
        let config: EsperaConfig = toml::from_str(toml_str).unwrap();
        let channel = config.channel.expect("channel section should parse");
        assert_eq!(channel.id, "default");
        assert_eq!(channel.source.driver, "memory");
        assert_eq!(
            channel.source.config,
            serde_json::json!({ "topic": "inbound" })
        );
        assert_eq!(channel.destination.driver, "memory");
    }
}
