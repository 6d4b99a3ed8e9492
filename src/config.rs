//! Configuration for AtlasKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for AtlasKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory for all data files
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// WAL file path (relative to data_dir)
    pub wal_path: PathBuf,

    /// Sync strategy: how often to fsync WAL.
    ///
    /// The WAL's own `append` always fsyncs before returning (durability is
    /// not optional for the core — see DESIGN.md OQ-1); this knob is
    /// retained for forward-compatibility with a batched acknowledgement
    /// path and is currently advisory.
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable / flush / checkpoint configuration
    // -------------------------------------------------------------------------
    /// Number of WAL appends since the last flush that triggers a flush.
    pub memtable_flush_threshold: usize,

    /// Wall-clock milliseconds since the last checkpoint that triggers one
    /// on the next write.
    pub checkpoint_interval_ms: u64,

    // -------------------------------------------------------------------------
    // SSTable Manager configuration
    // -------------------------------------------------------------------------
    /// Maximum number of live SSTables before a full compaction is triggered.
    pub max_sstables_before_compact: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
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
            data_dir: PathBuf::from("./atlaskv_data"),
            wal_path: PathBuf::from("wal.log"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            memtable_flush_threshold: 10_000,
            checkpoint_interval_ms: 60_000,
            max_sstables_before_compact: 10,
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
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
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable flush threshold (number of writes)
    pub fn memtable_flush_threshold(mut self, threshold: usize) -> Self {
        self.config.memtable_flush_threshold = threshold;
        self
    }

    /// Set the checkpoint interval in milliseconds
    pub fn checkpoint_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.checkpoint_interval_ms = interval_ms;
        self
    }

    /// Set the max SSTables before a compaction is triggered
    pub fn max_sstables_before_compact(mut self, max: usize) -> Self {
        self.config.max_sstables_before_compact = max;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the max concurrent connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set the read timeout in milliseconds
    pub fn read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.read_timeout_ms = timeout_ms;
        self
    }

    /// Set the write timeout in milliseconds
    pub fn write_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.write_timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
