//! Index
//!
//! Memory-mapped array of fixed-width entries mapping a segment-relative
//! offset to the position of its record in the paired store.
//!
//! ## Entry Format
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ Relative offset (4)  │   Store position (8)     │
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! The file is grown to its full capacity before mapping, since a mapping
//! cannot grow with the file. `close` shrinks it back to the bytes in use.
//! Closing order matters: the map is synced before the file is truncated,
//! otherwise unflushed entries would be cut off.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{LogError, Result};

use super::Layout;

/// Offset index of a single segment
///
/// Performs no locking of its own; the owning segment is only reached
/// through the log's lock.
pub struct Index {
    path: PathBuf,
    file: File,
    mmap: MmapMut,

    /// Bytes of the mapped region holding written entries
    size: u64,

    layout: Layout,
    closed: bool,
}

impl Index {
    /// Open or create the index file at `path` and map `max_index_bytes` of it
    ///
    /// The logical size is recovered from the existing file: its length
    /// rounded down to whole entries, cut at the first slot whose relative
    /// offset does not match its position. A file left pre-sized by an
    /// unclean shutdown therefore does not expose its zeroed tail as entries.
    pub fn open(path: &Path, max_index_bytes: u64, layout: Layout) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let capacity = max_index_bytes.max(file_len);
        file.set_len(capacity)?;

        // SAFETY: MmapMut::map_mut is unsafe because the file could be modified
        // externally while mapped. This is acceptable because:
        // 1. Segment files belong to a single log directory owned by this process
        // 2. The map lives exactly as long as this Index, which owns the file
        // 3. Every access goes through entry_slot(), which bounds-checks
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let mut index = Self {
            path: path.to_path_buf(),
            file,
            mmap,
            size: 0,
            layout,
            closed: false,
        };
        index.size = index.recover_size(file_len);

        Ok(index)
    }

    /// Read the entry in slot `relative`
    pub fn read(&self, relative: u32) -> Result<(u32, u64)> {
        let width = self.layout.entry_width();
        let start = relative as u64 * width;
        if self.size == 0 || start + width > self.size {
            return Err(LogError::EndOfIndex);
        }

        Ok(self.entry_at(relative as u64))
    }

    /// Read the last written entry
    pub fn last(&self) -> Result<(u32, u64)> {
        match self.len() {
            0 => Err(LogError::EndOfIndex),
            n => Ok(self.entry_at(n - 1)),
        }
    }

    /// Append one entry after the last written one
    pub fn write(&mut self, offset: u32, position: u64) -> Result<()> {
        if self.closed {
            return Err(LogError::Closed);
        }

        let width = self.layout.entry_width();
        if self.size + width > self.capacity() {
            return Err(LogError::IndexExhausted);
        }

        if position > self.layout.max_position() {
            return Err(LogError::Config(format!(
                "store position {} does not fit in a {}-byte index field",
                position, self.layout.position_width
            )));
        }

        let start = self.size as usize;
        let slot = &mut self.mmap[start..start + width as usize];
        self.layout.put_entry(slot, offset, position);
        self.size += width;

        Ok(())
    }

    /// Drop every entry from slot `entries` onwards
    pub fn truncate_entries(&mut self, entries: u64) {
        let new_size = (entries * self.layout.entry_width()).min(self.size);
        self.mmap[new_size as usize..self.size as usize].fill(0);
        self.size = new_size;
    }

    /// Sync the map and the file, then shrink the file to the bytes in use
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    /// Number of written entries
    pub fn len(&self) -> u64 {
        self.size / self.layout.entry_width()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes of written entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes of the mapped region
    pub fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// True when no further entry fits in the mapped region
    pub fn is_full(&self) -> bool {
        self.size + self.layout.entry_width() > self.capacity()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn entry_at(&self, slot: u64) -> (u32, u64) {
        let width = self.layout.entry_width() as usize;
        let start = slot as usize * width;
        self.layout.get_entry(&self.mmap[start..start + width])
    }

    fn recover_size(&self, file_len: u64) -> u64 {
        let width = self.layout.entry_width();
        let slots = file_len.min(self.capacity()) / width;

        let mut valid = 0;
        while valid < slots {
            let (offset, _) = self.entry_at(valid);
            if offset as u64 != valid {
                break;
            }
            valid += 1;
        }

        valid * width
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.mmap.flush().map_err(|source| LogError::Sync {
            path: self.path.clone(),
            source,
        })?;
        self.file.sync_all().map_err(|source| LogError::Sync {
            path: self.path.clone(),
            source,
        })?;
        self.file.set_len(self.size)?;

        Ok(())
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Failed to close index {}: {}", self.path.display(), e);
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("capacity", &self.capacity())
            .finish()
    }
}
