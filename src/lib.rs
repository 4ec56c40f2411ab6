//! # seglog
//!
//! A segmented, append-only commit log with:
//! - Monotonic offsets assigned on append, reads by offset
//! - Size-bounded segments with automatic rollover
//! - Memory-mapped offset indexes
//! - Recovery from the segment files alone (no manifest)
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (acceptor + worker pool)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ append / read
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Log                                   │
//! │       (RwLock: appends + rollover exclusive, reads shared)   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ route by offset
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!  ┌──────────┐   ┌──────────┐   ┌──────────┐
//!  │ Segment  │   │ Segment  │   │ Segment  │  (active)
//!  │ (sealed) │   │ (sealed) │   │          │
//!  └────┬─────┘   └──────────┘   └────┬─────┘
//!       │                             │
//!   ┌───┴────┐                    ┌───┴────┐
//!   ▼        ▼                    ▼        ▼
//! Store    Index                Store    Index
//! (file)  (mmap)                (file)  (mmap)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use seglog::{Log, SegmentConfig};
//!
//! # fn main() -> seglog::Result<()> {
//! let log = Log::open("/tmp/seglog", SegmentConfig::default())?;
//! let offset = log.append(b"hello")?;
//! assert_eq!(&log.read(offset)?.value[..], b"hello");
//! log.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig};
pub use log::{Log, LogReader, Record};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seglog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
