//! Node configuration with TOML file support.

use crate::error::NodeError;
use crate::logging::LogFormat;
use lattice_messages::NetworkId;
use lattice_types::ProtocolParams;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to participate in.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Protocol parameters (network constants, not operator configuration).
    #[serde(skip)]
    pub params: ProtocolParams,

    /// Capacity of the block ingest queue.
    #[serde(default = "default_block_queue")]
    pub block_queue_max: usize,

    /// Capacity of the vote ingest queue.
    #[serde(default = "default_vote_queue")]
    pub vote_queue_max: usize,

    /// Maximum gapped blocks buffered awaiting their dependency.
    #[serde(default = "default_unchecked_max")]
    pub unchecked_max: usize,

    /// Capacity of the balance-ordered election backlog.
    #[serde(default = "default_backlog_max")]
    pub backlog_max: usize,

    /// Whether confirmed history is pruned.
    #[serde(default)]
    pub enable_pruning: bool,

    /// Election driving interval.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Online weight sampling interval.
    #[serde(default = "default_sampler_interval_secs")]
    pub sampler_interval_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_block_queue() -> usize {
    8_192
}

fn default_vote_queue() -> usize {
    16_384
}

fn default_unchecked_max() -> usize {
    65_536
}

fn default_backlog_max() -> usize {
    100_000
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_sampler_interval_secs() -> u64 {
    5
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format_parsed(&self) -> Result<LogFormat, NodeError> {
        match self.log_format.as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!("unknown log format {other:?}"))),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            params: ProtocolParams::default(),
            block_queue_max: default_block_queue(),
            vote_queue_max: default_vote_queue(),
            unchecked_max: default_unchecked_max(),
            backlog_max: default_backlog_max(),
            enable_pruning: false,
            tick_interval_ms: default_tick_interval_ms(),
            sampler_interval_secs: default_sampler_interval_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
