//! Configuration for seglog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogError, Result};
use crate::log::Layout;

/// Main configuration for a seglog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 00000000000000000000.store
    ///     ├── 00000000000000000000.index
    ///     └── ...                 (one pair per segment)
    pub data_dir: PathBuf,

    /// Segment limits and encoding shared by every segment of the log
    pub segment: SegmentConfig,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of worker threads serving connections
    pub worker_threads: usize,

    /// Max connections queued for a worker before new ones are refused
    pub max_pending_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Per-segment limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Store size (bytes) at which a segment is considered full
    pub max_store_bytes: u64,

    /// Size of the mapped index region; also bounds records per segment
    pub max_index_bytes: u64,

    /// Offset assigned to the first record of a freshly bootstrapped log
    pub initial_offset: u64,

    /// Field widths of the on-disk encoding
    pub layout: Layout,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 1024 * 1024 * 1024, // 1 GB
            max_index_bytes: 10 * 1024 * 1024,   // 10 MB
            initial_offset: 0,
            layout: Layout::default(),
        }
    }
}

impl SegmentConfig {
    /// Check that the limits describe a usable segment
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;

        if self.max_store_bytes == 0 {
            return Err(LogError::Config(
                "max_store_bytes must be greater than zero".to_string(),
            ));
        }

        let entry_width = self.layout.entry_width();
        if self.max_index_bytes < entry_width {
            return Err(LogError::Config(format!(
                "max_index_bytes ({}) must hold at least one {}-byte index entry",
                self.max_index_bytes, entry_width
            )));
        }

        Ok(())
    }

    /// Number of records a single segment can index
    pub fn records_per_segment(&self) -> u64 {
        self.max_index_bytes / self.layout.entry_width()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./seglog_data"),
            segment: SegmentConfig::default(),
            listen_addr: "127.0.0.1:7070".to_string(),
            worker_threads: 8,
            max_pending_connections: 1024,
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

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.segment.validate()?;

        if self.worker_threads == 0 {
            return Err(LogError::Config(
                "worker_threads must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (where segment files live)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the store size at which segments roll over (in bytes)
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_store_bytes = bytes;
        self
    }

    /// Set the index region size (in bytes)
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_index_bytes = bytes;
        self
    }

    /// Set the offset of the first record in a new log
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.config.segment.initial_offset = offset;
        self
    }

    /// Set the on-disk field widths
    pub fn layout(mut self, layout: Layout) -> Self {
        self.config.segment.layout = layout;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set how many accepted connections may wait for a worker
    pub fn max_pending_connections(mut self, count: usize) -> Self {
        self.config.max_pending_connections = count;
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
