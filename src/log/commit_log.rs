//! Log
//!
//! Ordered collection of segments addressed by absolute offset.
//!
//! ## Responsibilities
//! - Rebuild the segment list from the directory on open
//! - Route appends to the active segment and roll over when it is full
//! - Route reads to the segment whose offset range covers them
//! - Drop whole segments below a retention boundary

use std::collections::BTreeSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};

use super::{LogReader, Record, Segment};

/// Segmented, append-only commit log
///
/// ## Concurrency:
/// - `segments`: one RwLock for the whole list
/// - `append` and `truncate` take the write side (rollover happens under it)
/// - `read`, `lowest_offset`, `highest_offset`, `reader` take the read side,
///   so reads run concurrently but never alongside a rollover
pub struct Log {
    /// Directory holding the segment files
    dir: PathBuf,

    /// Limits shared by every segment
    config: SegmentConfig,

    /// Segments ordered by base offset; the last one is active. Never empty.
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open or create a log in `dir`
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Collect base offsets from `*.store` / `*.index` files
    /// 3. Open a segment per base offset, ascending; all but the last are sealed
    /// 4. With no segments on disk, bootstrap one at `initial_offset`
    pub fn open(dir: impl AsRef<Path>, config: SegmentConfig) -> Result<Self> {
        config.validate()?;

        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let base_offsets = scan_base_offsets(dir)?;

        let mut segments: Vec<Segment> = Vec::with_capacity(base_offsets.len().max(1));
        for base_offset in base_offsets {
            if let Some(previous) = segments.last_mut() {
                if previous.next_offset() != base_offset {
                    tracing::warn!(
                        "Segment gap in {}: segment {} ends at {}, next starts at {}",
                        dir.display(),
                        previous.base_offset(),
                        previous.next_offset(),
                        base_offset
                    );
                }
                previous.seal();
            }
            segments.push(Segment::open(dir, base_offset, config)?);
        }

        if segments.is_empty() {
            segments.push(Segment::open(dir, config.initial_offset, config)?);
        }

        let log = Self {
            dir: dir.to_path_buf(),
            config,
            segments: RwLock::new(segments),
        };

        {
            let mut segments = log.segments.write();
            if active(&mut segments)?.is_maxed() {
                log.roll_over(&mut segments)?;
            }

            tracing::debug!(
                "Opened log {} with {} segment(s), offsets {:?}",
                log.dir.display(),
                segments.len(),
                offset_range(&segments)
            );
        }

        Ok(log)
    }

    /// Open a log that already has segment files in `dir`
    ///
    /// Unlike `open`, a missing directory or one without segment files is an
    /// error instead of a fresh log.
    pub fn open_existing(dir: impl AsRef<Path>, config: SegmentConfig) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LogError::Config(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if scan_base_offsets(dir)?.is_empty() {
            return Err(LogError::Config(format!(
                "{} holds no segment files",
                dir.display()
            )));
        }

        Self::open(dir, config)
    }

    /// Append a record, returning its offset
    ///
    /// If the active segment is full afterwards, a new segment starting at
    /// its `next_offset` becomes active. Should that fail, the error is
    /// returned even though the record itself was committed; the next append
    /// retries the rollover.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let mut segments = self.segments.write();

        if active(&mut segments)?.is_maxed() {
            self.roll_over(&mut segments)?;
        }

        let offset = active(&mut segments)?.append(payload)?;

        if active(&mut segments)?.is_maxed() {
            self.roll_over(&mut segments)?;
        }

        Ok(offset)
    }

    /// Read the record at `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.segments.read();

        // Segments are sorted and contiguous, so next_offset is monotonic
        let position = segments.partition_point(|s| s.next_offset() <= offset);
        match segments.get(position) {
            Some(segment) if segment.contains(offset) => segment.read(offset),
            _ => Err(LogError::OffsetOutOfRange { offset }),
        }
    }

    /// Offset of the oldest record still held (or of the next record, if empty)
    pub fn lowest_offset(&self) -> u64 {
        let segments = self.segments.read();
        segments
            .first()
            .map(Segment::base_offset)
            .unwrap_or(self.config.initial_offset)
    }

    /// Offset of the newest record, or `None` when the log holds no records
    pub fn highest_offset(&self) -> Option<u64> {
        let segments = self.segments.read();
        let range = offset_range(&segments);
        if range.is_empty() {
            None
        } else {
            Some(range.end - 1)
        }
    }

    /// Remove every segment whose records all lie below `lowest`
    ///
    /// A segment is removed when its `next_offset <= lowest`. If that takes
    /// the active segment too, an empty segment is opened at the removed
    /// active segment's `next_offset` so offsets never go backwards. That
    /// segment is opened before anything is removed; if it cannot be opened
    /// the log is left untouched. An empty active segment is never removed.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.segments.write();

        let active_segment = active(&mut segments)?;
        let next_offset = active_segment.next_offset();
        let active_is_empty = active_segment.is_empty();

        let mut split = segments.partition_point(|s| s.next_offset() <= lowest);
        if split == segments.len() && active_is_empty {
            split -= 1;
        }
        if split == 0 {
            return Ok(());
        }

        let replacement = if split == segments.len() {
            Some(Segment::open(&self.dir, next_offset, self.config)?)
        } else {
            None
        };

        let removed: Vec<Segment> = segments.drain(..split).collect();
        let removed_count = removed.len();
        segments.extend(replacement);

        let mut first_error = None;
        for segment in removed {
            let base_offset = segment.base_offset();
            if let Err(e) = segment.remove() {
                tracing::warn!("Failed to remove segment {}: {}", base_offset, e);
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(
            "Truncated log {} below offset {}: removed {} segment(s)",
            self.dir.display(),
            lowest,
            removed_count
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stream the raw store bytes of every segment, oldest first
    ///
    /// The reader covers what was written when it was created; later appends
    /// are not included. The log's lock is only held while it is built.
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        let parts = segments
            .iter()
            .map(|s| {
                let store = Arc::clone(s.store());
                let end = store.size();
                (store, end)
            })
            .collect();

        LogReader::new(parts)
    }

    /// Close every segment
    ///
    /// All segments are closed even if one fails; the first error is returned.
    pub fn close(self) -> Result<()> {
        let segments = self.segments.into_inner();

        let mut first_error = None;
        for segment in segments {
            if let Err(e) = segment.close() {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close the log and delete its directory
    pub fn remove(self) -> Result<()> {
        let dir = self.dir.clone();
        self.close()?;
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// `[base_offset, next_offset)` of each segment, oldest first
    pub fn segment_ranges(&self) -> Vec<Range<u64>> {
        self.segments
            .read()
            .iter()
            .map(|s| s.base_offset()..s.next_offset())
            .collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Seal the active segment and open a new one at its next offset
    /// (called with the write lock held)
    fn roll_over(&self, segments: &mut Vec<Segment>) -> Result<()> {
        let current = active(segments)?;
        let base_offset = current.next_offset();
        let sealed = current.base_offset();

        let next = Segment::open(&self.dir, base_offset, self.config)?;
        active(segments)?.seal();
        segments.push(next);

        tracing::debug!(
            "Rolled over segment {} in {}: new active segment {}",
            sealed,
            self.dir.display(),
            base_offset
        );

        Ok(())
    }
}

/// Base offsets of every segment file in `dir`, ascending
fn scan_base_offsets(dir: &Path) -> Result<BTreeSet<u64>> {
    let mut base_offsets = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(base_offset) = Segment::parse_base_offset(&path) {
                base_offsets.insert(base_offset);
            }
        }
    }
    Ok(base_offsets)
}

/// The writable segment at the end of the list
fn active(segments: &mut [Segment]) -> Result<&mut Segment> {
    segments.last_mut().ok_or(LogError::Closed)
}

/// `[lowest, next)` across all segments
fn offset_range(segments: &[Segment]) -> Range<u64> {
    match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => first.base_offset()..last.next_offset(),
        _ => 0..0,
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("dir", &self.dir)
            .field("segments", &self.segment_ranges())
            .finish()
    }
}
