//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file
//! and convert into the runtime configs the engines take.
//!
//! Example configuration:
//!
//! ```toml
//! [node]
//! id = "node-1"
//!
//! [consensus]
//! sweep_interval_secs = 5
//! recent_window = 50
//!
//! [memory]
//! cache_capacity = 10000
//! enable_compression = true
//! ```

use hivemind_application::{ConsensusConfig, MemoryConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Node identity and data location
    pub node: FileNodeConfig,
    /// Consensus engine settings
    pub consensus: FileConsensusConfig,
    /// Memory manager settings
    pub memory: FileMemoryConfig,
}

/// Node identity configuration (`[node]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNodeConfig {
    /// Node identifier; defaults to the hostname-style fallback "node-local"
    pub id: String,
    /// Directory for the durable store; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

impl Default for FileNodeConfig {
    fn default() -> Self {
        Self {
            id: "node-local".to_string(),
            data_dir: None,
        }
    }
}

impl FileNodeConfig {
    /// Resolve the durable-store file path
    pub fn store_path(&self) -> PathBuf {
        let base = self
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("hive-mind")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(format!("{}.store.jsonl", self.id))
    }
}

/// Consensus engine configuration (`[consensus]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    /// Period of the active-proposal re-check sweep, in seconds
    pub sweep_interval_secs: u64,
    /// Period of the deadline sweep, in milliseconds
    pub deadline_interval_ms: u64,
    /// Period of the metrics sweep, in seconds
    pub metrics_interval_secs: u64,
    /// How many recent proposals feed the average-voting-time figure
    pub recent_window: usize,
    /// Smoothing factor for the participation moving average
    pub participation_alpha: f64,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        let defaults = ConsensusConfig::default();
        Self {
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            deadline_interval_ms: defaults.deadline_interval.as_millis() as u64,
            metrics_interval_secs: defaults.metrics_interval.as_secs(),
            recent_window: defaults.recent_window,
            participation_alpha: defaults.participation_alpha,
        }
    }
}

impl FileConsensusConfig {
    pub fn to_consensus_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            deadline_interval: Duration::from_millis(self.deadline_interval_ms.max(100)),
            metrics_interval: Duration::from_secs(self.metrics_interval_secs.max(1)),
            recent_window: self.recent_window.max(1),
            participation_alpha: self.participation_alpha.clamp(0.0, 1.0),
        }
    }
}

/// Memory manager configuration (`[memory]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMemoryConfig {
    /// Cache capacity bound (entries)
    pub cache_capacity: usize,
    /// Encode values through the codec before the durable write
    pub enable_compression: bool,
    /// Derive and resolve related keys after each write
    pub enable_prefetch: bool,
    /// Honor batched write options
    pub enable_batching: bool,
    /// Flush the batch queue once it reaches this many entries
    pub batch_flush_size: usize,
    /// Flush the batch queue at least this often, in milliseconds
    pub batch_flush_interval_ms: u64,
    /// Period of the metrics tick, in seconds
    pub metrics_interval_secs: u64,
    /// Average-latency level (ms) above which health degrades
    pub performance_threshold_ms: f64,
    /// Error-rate level above which health degrades
    pub error_threshold: f64,
    /// Default bound on the peer-fetch step of a read, in milliseconds
    pub peer_fetch_timeout_ms: u64,
}

impl Default for FileMemoryConfig {
    fn default() -> Self {
        let defaults = MemoryConfig::default();
        Self {
            cache_capacity: defaults.cache_capacity,
            enable_compression: defaults.enable_compression,
            enable_prefetch: defaults.enable_prefetch,
            enable_batching: defaults.enable_batching,
            batch_flush_size: defaults.batch_flush_size,
            batch_flush_interval_ms: defaults.batch_flush_interval.as_millis() as u64,
            metrics_interval_secs: defaults.metrics_interval.as_secs(),
            performance_threshold_ms: defaults.performance_threshold_ms,
            error_threshold: defaults.error_threshold,
            peer_fetch_timeout_ms: defaults.peer_fetch_timeout.as_millis() as u64,
        }
    }
}

impl FileMemoryConfig {
    pub fn to_memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            cache_capacity: self.cache_capacity.max(1),
            enable_compression: self.enable_compression,
            enable_prefetch: self.enable_prefetch,
            enable_batching: self.enable_batching,
            batch_flush_size: self.batch_flush_size.max(1),
            batch_flush_interval: Duration::from_millis(self.batch_flush_interval_ms.max(10)),
            metrics_interval: Duration::from_secs(self.metrics_interval_secs.max(1)),
            performance_threshold_ms: self.performance_threshold_ms,
            error_threshold: self.error_threshold,
            peer_fetch_timeout: Duration::from_millis(self.peer_fetch_timeout_ms.max(10)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[node]
id = "node-7"

[consensus]
sweep_interval_secs = 2
recent_window = 25

[memory]
cache_capacity = 500
enable_compression = false
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.node.id, "node-7");
        assert_eq!(config.consensus.sweep_interval_secs, 2);
        assert_eq!(config.consensus.recent_window, 25);
        assert_eq!(config.memory.cache_capacity, 500);
        assert!(!config.memory.enable_compression);
        // Unspecified fields keep their defaults
        assert!(config.memory.enable_prefetch);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[node]\nid = \"n\"\n").unwrap();
        assert_eq!(config.node.id, "n");
        assert_eq!(config.consensus, FileConsensusConfig::default());
        assert_eq!(config.memory, FileMemoryConfig::default());
    }

    #[test]
    fn test_conversion_clamps_degenerate_values() {
        let file = FileConsensusConfig {
            sweep_interval_secs: 0,
            participation_alpha: 3.0,
            ..Default::default()
        };
        let config = file.to_consensus_config();
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.participation_alpha, 1.0);

        let memory = FileMemoryConfig {
            cache_capacity: 0,
            batch_flush_size: 0,
            ..Default::default()
        };
        let config = memory.to_memory_config();
        assert_eq!(config.cache_capacity, 1);
        assert_eq!(config.batch_flush_size, 1);
    }

    #[test]
    fn test_store_path_uses_node_id() {
        let node = FileNodeConfig {
            id: "node-9".to_string(),
            data_dir: Some(PathBuf::from("/tmp/hive")),
        };
        assert_eq!(
            node.store_path(),
            PathBuf::from("/tmp/hive/node-9.store.jsonl")
        );
    }

    #[test]
    fn test_defaults_roundtrip_to_runtime_configs() {
        let file = FileConfig::default();
        assert_eq!(
            file.consensus.to_consensus_config().sweep_interval,
            ConsensusConfig::default().sweep_interval
        );
        assert_eq!(
            file.memory.to_memory_config().cache_capacity,
            MemoryConfig::default().cache_capacity
        );
    }
}
