//! Segment
//!
//! One store and one index sharing a base offset.
//!
//! ## Lifecycle
//! ```text
//!   Writable ──seal()──▶ Sealed ──remove()──▶ (files deleted)
//! ```
//! Only the log's active segment is writable; sealed segments keep serving
//! reads until truncation removes them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};

use super::{Index, Record, Store};

/// Extension of store files
pub const STORE_EXTENSION: &str = "store";

/// Extension of index files
pub const INDEX_EXTENSION: &str = "index";

/// Whether a segment still accepts appends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Writable,
    Sealed,
}

/// A bounded run of consecutive records
pub struct Segment {
    /// Absolute offset of the first record
    base_offset: u64,

    /// Offset the next append will receive
    next_offset: u64,

    /// Shared with log readers that outlive the log's read lock
    store: Arc<Store>,

    index: Index,
    config: SegmentConfig,
    state: SegmentState,
}

impl Segment {
    /// Open or create the segment starting at `base_offset` in `dir`
    ///
    /// On open:
    /// 1. Open (or create) `<base>.store` and `<base>.index`
    /// 2. Drop trailing index entries whose record is not entirely in the store
    /// 3. Cut the store back to the end of the last indexed record
    /// 4. Derive `next_offset` from the last remaining index entry
    pub fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self> {
        let store = Store::open(&Self::store_path(dir, base_offset), config.layout)?;
        let mut index = Index::open(
            &Self::index_path(dir, base_offset),
            config.max_index_bytes,
            config.layout,
        )?;

        let mut kept = index.len();
        let mut store_end = 0;
        while kept > 0 {
            let (_, position) = index.read((kept - 1) as u32)?;
            if let Some(end) = store.record_end(position)? {
                store_end = end;
                break;
            }
            kept -= 1;
        }

        if kept < index.len() {
            tracing::warn!(
                "Segment {}: discarding {} index entries for records missing from the store",
                base_offset,
                index.len() - kept
            );
            index.truncate_entries(kept);
        }

        if store.size() > store_end {
            tracing::warn!(
                "Segment {}: truncating {} unindexed store bytes",
                base_offset,
                store.size() - store_end
            );
            store.truncate(store_end)?;
        }

        let next_offset = match index.last() {
            Ok((relative, _)) => base_offset + relative as u64 + 1,
            Err(LogError::EndOfIndex) => base_offset,
            Err(e) => return Err(e),
        };

        Ok(Self {
            base_offset,
            next_offset,
            store: Arc::new(store),
            index,
            config,
            state: SegmentState::Writable,
        })
    }

    /// Append a record, returning the offset assigned to it
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        if self.state == SegmentState::Sealed {
            return Err(LogError::SegmentSealed {
                base_offset: self.base_offset,
            });
        }

        let offset = self.next_offset;
        let relative = offset - self.base_offset;

        // Refuse before touching the store so no unindexed record is left behind
        if self.index.is_full() || relative > self.config.layout.max_relative_offset() {
            return Err(LogError::IndexExhausted);
        }

        let (_, position) = self.store.append(payload)?;
        self.index.write(relative as u32, position)?;
        self.next_offset += 1;

        Ok(offset)
    }

    /// Read the record at absolute `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        if !self.contains(offset) {
            return Err(LogError::OffsetOutOfRange { offset });
        }

        let relative = (offset - self.base_offset) as u32;
        let (_, position) = self.index.read(relative)?;
        let value = self.store.read(position)?;

        Ok(Record { offset, value })
    }

    /// True once the store or the index has reached its limit
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.is_full()
            || self.next_offset - self.base_offset > self.config.layout.max_relative_offset()
    }

    /// Stop accepting appends. There is no way back to `Writable`.
    pub fn seal(&mut self) {
        self.state = SegmentState::Sealed;
    }

    /// Close the segment and delete both of its files
    pub fn remove(self) -> Result<()> {
        let store_path = self.store.path().to_path_buf();
        let index_path = self.index.path().to_path_buf();

        self.close()?;
        fs::remove_file(&store_path)?;
        fs::remove_file(&index_path)?;

        Ok(())
    }

    /// Close the store and the index
    ///
    /// Both are closed even if the first fails; the first error is returned.
    pub fn close(self) -> Result<()> {
        let Segment { store, index, .. } = self;

        let store_result = store.close();
        let index_result = index.close();

        store_result.and(index_result)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// True if `offset` falls in `[base_offset, next_offset)`
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.base_offset && offset < self.next_offset
    }

    /// Number of records in the segment
    pub fn len(&self) -> u64 {
        self.next_offset - self.base_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    // =========================================================================
    // File Naming
    // =========================================================================

    /// `<dir>/<base, 20 digits>.store`
    pub fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
        dir.join(format!("{:020}.{}", base_offset, STORE_EXTENSION))
    }

    /// `<dir>/<base, 20 digits>.index`
    pub fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
        dir.join(format!("{:020}.{}", base_offset, INDEX_EXTENSION))
    }

    /// Parse the base offset from a segment file name
    /// "00000000000000000042.store" → Some(42)
    pub fn parse_base_offset(path: &Path) -> Option<u64> {
        let extension = path.extension()?.to_str()?;
        if extension != STORE_EXTENSION && extension != INDEX_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.len() != 20 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok()
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("base_offset", &self.base_offset)
            .field("next_offset", &self.next_offset)
            .field("state", &self.state)
            .finish()
    }
}
