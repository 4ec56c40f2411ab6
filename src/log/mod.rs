//! Commit Log Module
//!
//! Durable, offset-addressed record storage split into segments.
//!
//! ## Responsibilities
//! - Append records with monotonically increasing offsets
//! - Resolve an offset to its record through a memory-mapped index
//! - Roll over to a new segment when size limits are reached
//! - Rebuild all state from the segment files on open
//! - Drop whole segments below a retention boundary
//!
//! ## Directory Layout
//! ```text
//! {dir}/
//!   ├── 00000000000000000000.store   records 0..N
//!   ├── 00000000000000000000.index
//!   ├── 0000000000000000000N.store   records N..
//!   └── 0000000000000000000N.index
//! ```
//!
//! ## File Formats
//! ```text
//! store:  ┌─────────┬──────────┬─────────┬──────────┬──
//!         │ Len (8) │ Payload  │ Len (8) │ Payload  │ ...
//!         └─────────┴──────────┴─────────┴──────────┴──
//!
//! index:  ┌────────────┬──────────────┬────────────┬──────────────┬──
//!         │ RelOff (4) │ Position (8) │ RelOff (4) │ Position (8) │ ...
//!         └────────────┴──────────────┴────────────┴──────────────┴──
//! ```
//! All integers are big-endian. There is no manifest: the file pairs
//! themselves are the source of truth.

mod layout;
mod record;
mod store;
mod index;
mod segment;
mod reader;
mod commit_log;

pub use layout::{Layout, LEN_WIDTH, OFFSET_WIDTH, POSITION_WIDTH};
pub use record::Record;
pub use store::Store;
pub use index::Index;
pub use segment::{Segment, SegmentState, INDEX_EXTENSION, STORE_EXTENSION};
pub use reader::LogReader;
pub use commit_log::Log;
