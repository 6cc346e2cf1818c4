//! Configuration for the tangle node

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Consensus application client
    pub consensus: ConsensusConfig,

    /// Tip selection
    pub tip_selection: TipSelectionConfig,

    /// DAG bookkeeping
    pub dag: DagConfig,

    /// Persistence actor
    pub persistence: PersistenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/tangle"),
            service_name: "tangle-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            consensus: ConsensusConfig::default(),
            tip_selection: TipSelectionConfig::default(),
            dag: DagConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

/// Consensus application client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// gRPC endpoint of the validation application
    pub endpoint: String,

    /// Fully qualified gRPC method path
    pub method_path: String,

    /// Deadline for one validation call (milliseconds)
    pub timeout_ms: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:50052".to_string(),
            method_path: "/proto.StreamnetService/StoreBlock".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Tip selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TipSelectionConfig {
    /// Approval fan-in K (trunk + branch)
    pub approvals: usize,

    /// Walk budget D
    pub walk_depth: usize,

    /// Retries when a walk lands on an already selected tip
    pub max_retries: usize,

    /// Fixed RNG seed for reproducible walks
    pub seed: Option<u64>,
}

impl Default for TipSelectionConfig {
    fn default() -> Self {
        Self {
            approvals: 2,
            walk_depth: 15,
            max_retries: 3,
            seed: None,
        }
    }
}

/// DAG configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// How many approval levels a weight increment travels on insert
    pub weight_propagation_depth: usize,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            weight_propagation_depth: 128,
        }
    }
}

/// Persistence actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Bounded mailbox capacity
    pub mailbox_capacity: usize,

    /// Maximum batch size (transactions)
    pub max_batch_size: usize,

    /// Batch timeout (milliseconds)
    pub batch_timeout_ms: u64,

    /// Enable batching
    pub batching_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            max_batch_size: 100,
            batch_timeout_ms: 10,
            batching_enabled: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TANGLE_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(endpoint) = std::env::var("TANGLE_CONSENSUS_ENDPOINT") {
            config.consensus.endpoint = endpoint;
        }

        if let Ok(timeout) = std::env::var("TANGLE_CONSENSUS_TIMEOUT_MS") {
            config.consensus.timeout_ms = timeout
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid consensus timeout: {}", e)))?;
        }

        if let Ok(seed) = std::env::var("TANGLE_TIP_SEED") {
            config.tip_selection.seed = Some(
                seed.parse()
                    .map_err(|e| crate::Error::Config(format!("Invalid tip seed: {}", e)))?,
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the node cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.tip_selection.approvals == 0 {
            return Err(crate::Error::Config("approvals must be at least 1".into()));
        }
        if self.tip_selection.walk_depth == 0 {
            return Err(crate::Error::Config("walk_depth must be at least 1".into()));
        }
        if self.consensus.timeout_ms == 0 {
            return Err(crate::Error::Config("consensus timeout must be non-zero".into()));
        }
        if self.persistence.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox_capacity must be non-zero".into()));
        }
        Ok(())
    }
}
