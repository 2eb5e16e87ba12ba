//! Configuration for shardkv
//!
//! Centralized configuration with sensible defaults. The storage engine and the
//! partition registry are configured independently since they usually live in
//! different processes.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ShardError};

/// Configuration for one storage engine (one partition replica)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for this replica's data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log of write batches)
    ///     └── checkpoint.sst   (sorted snapshot of the substrate)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Checkpoint the substrate once the WAL holds this many bytes (0 = never)
    pub checkpoint_wal_bytes: u64,

    // -------------------------------------------------------------------------
    // Key Space Configuration
    // -------------------------------------------------------------------------
    /// Maintain per-table key counters; keys must then carry a table prefix
    pub table_counter: bool,

    /// Delimiter separating the table prefix from the rest of a user key
    pub table_delimiter: u8,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./shardkv_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_wal_bytes: 64 * 1024 * 1024, // 64 MB
            table_counter: true,
            table_delimiter: b':',
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size that triggers a checkpoint (in bytes)
    pub fn checkpoint_wal_bytes(mut self, bytes: u64) -> Self {
        self.config.checkpoint_wal_bytes = bytes;
        self
    }

    /// Enable or disable per-table key counters
    pub fn table_counter(mut self, enabled: bool) -> Self {
        self.config.table_counter = enabled;
        self
    }

    /// Set the table delimiter byte
    pub fn table_delimiter(mut self, delimiter: u8) -> Self {
        self.config.table_delimiter = delimiter;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Configuration for a registry handle
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root prefix under which all cluster state lives
    pub root: String,

    /// Cluster identifier; each cluster gets its own subtree under `root`
    pub cluster_id: String,

    /// TTL of the lease attached to registered data nodes
    pub node_ttl: Duration,

    /// How often registered node leases are renewed
    pub keepalive_interval: Duration,

    /// TTL of the lease backing a leadership claim
    pub leader_ttl: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: "/shardkv".to_string(),
            cluster_id: "default".to_string(),
            node_ttl: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(3),
            leader_ttl: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Create a new registry config builder
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Check that the keepalive loop can renew leases before they expire
    pub fn validate(&self) -> Result<()> {
        if self.cluster_id.is_empty() || self.cluster_id.contains('/') {
            return Err(ShardError::Config(format!(
                "invalid cluster id: {:?}",
                self.cluster_id
            )));
        }
        if self.keepalive_interval >= self.node_ttl || self.keepalive_interval >= self.leader_ttl {
            return Err(ShardError::Config(
                "keepalive interval must be shorter than lease TTLs".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for RegistryConfig
#[derive(Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    /// Set the root prefix
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the cluster id
    pub fn cluster_id(mut self, id: impl Into<String>) -> Self {
        self.config.cluster_id = id.into();
        self
    }

    /// Set the data node lease TTL
    pub fn node_ttl(mut self, ttl: Duration) -> Self {
        self.config.node_ttl = ttl;
        self
    }

    /// Set the keepalive interval
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    /// Set the leadership lease TTL
    pub fn leader_ttl(mut self, ttl: Duration) -> Self {
        self.config.leader_ttl = ttl;
        self
    }

    pub fn build(self) -> RegistryConfig {
        self.config
    }
}
