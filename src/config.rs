//! Configuration for DuraKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::logger::MemoryLog;

/// Main configuration for a DuraKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log Configuration
    // -------------------------------------------------------------------------
    /// Which backend records the event history
    pub logger: LoggerBackend,

    /// Sync strategy: how often the file backend fsyncs
    pub sync_strategy: SyncStrategy,

    /// What file replay does with an unterminated final record
    pub recovery_mode: RecoveryMode,

    // -------------------------------------------------------------------------
    // Request Configuration
    // -------------------------------------------------------------------------
    /// Largest accepted value for a PUT (in bytes)
    pub max_value_size: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

/// Transaction log backend selection
#[derive(Debug, Clone)]
pub enum LoggerBackend {
    /// Append-only tab-separated text file
    File { path: PathBuf },

    /// SQLite database table
    Sqlite { path: PathBuf, table: String },

    /// Process-local event list (tests, ephemeral runs)
    Memory(MemoryLog),
}

impl LoggerBackend {
    /// Default table name for the relational backend
    pub const DEFAULT_TABLE: &'static str = "transactions";
}

/// File log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N written events (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Handling of a torn (unterminated) final line during file replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Treat it as corruption and abort replay
    Strict,

    /// Cut the file back to the last complete line and continue
    TruncateTornTail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger: LoggerBackend::File {
                path: PathBuf::from("transaction.log"),
            },
            sync_strategy: SyncStrategy::EveryWrite,
            recovery_mode: RecoveryMode::Strict,
            max_value_size: 1024,
            listen_addr: "127.0.0.1:8080".to_string(),
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
    /// Log to an append-only file
    pub fn file_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logger = LoggerBackend::File { path: path.into() };
        self
    }

    /// Log to a table in a SQLite database
    pub fn sqlite_log(mut self, path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        self.config.logger = LoggerBackend::Sqlite {
            path: path.into(),
            table: table.into(),
        };
        self
    }

    /// Log to a shared in-memory event list
    pub fn memory_log(mut self, log: MemoryLog) -> Self {
        self.config.logger = LoggerBackend::Memory(log);
        self
    }

    /// Set the file log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the torn-tail recovery mode
    pub fn recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.config.recovery_mode = mode;
        self
    }

    /// Set the maximum value size (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
