//! Store
//!
//! Append-only file of length-prefixed records.
//!
//! ## Record Format
//! ```text
//! ┌──────────────┬──────────────────────┐
//! │  Len (8, BE) │   Payload (Len)      │
//! └──────────────┴──────────────────────┘
//! ```
//! No checksum and no footer; records are simply concatenated.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{LogError, Result};

use super::Layout;

/// Buffered, append-only record file
///
/// ## Concurrency:
/// - Every method takes the same `Mutex`, so appends and reads never interleave
/// - Reads flush the write buffer first, so they always observe prior appends
pub struct Store {
    /// Path of the backing file
    path: PathBuf,

    /// Width of the length prefix
    layout: Layout,

    /// Writer and size, guarded together
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// `None` once the store has been closed
    writer: Option<BufWriter<File>>,

    /// Bytes written so far, buffered or durable
    size: u64,
}

impl Store {
    /// Open or create the store file at `path`
    ///
    /// The current file length becomes the store size, so appends continue
    /// after existing records.
    pub fn open(path: &Path, layout: Layout) -> Result<Self> {
        // Append mode: writes always land at the end even after a read seeks
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            layout,
            inner: Mutex::new(StoreInner {
                writer: Some(BufWriter::new(file)),
                size,
            }),
        })
    }

    /// Append one record
    ///
    /// Returns `(bytes_written, position)`: the prefix plus payload length, and
    /// the position at which the record starts.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let len = payload.len() as u64;
        let max = self.layout.max_record_len();
        if len > max {
            return Err(LogError::RecordTooLarge { size: len, max });
        }

        let mut inner = self.inner.lock();
        let position = inner.size;

        let mut prefix = Vec::with_capacity(self.layout.len_width);
        self.layout.put_len(&mut prefix, len);

        let writer = inner.writer.as_mut().ok_or(LogError::Closed)?;
        writer.write_all(&prefix)?;
        writer.write_all(payload)?;

        let written = prefix.len() as u64 + len;
        inner.size += written;

        Ok((written, position))
    }

    /// Read the record starting at `position`
    pub fn read(&self, position: u64) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let writer = inner.writer.as_mut().ok_or(LogError::Closed)?;
        writer.flush()?;

        let file = writer.get_mut();
        let (payload_start, len) =
            locate(file, self.layout, size, position)?.ok_or(LogError::EndOfStore)?;

        file.seek(SeekFrom::Start(payload_start))?;
        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;

        Ok(Bytes::from(payload))
    }

    /// End position of the record starting at `position`
    ///
    /// `None` if the prefix or the payload runs past the written bytes.
    pub fn record_end(&self, position: u64) -> Result<Option<u64>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let writer = inner.writer.as_mut().ok_or(LogError::Closed)?;
        writer.flush()?;

        let record = locate(writer.get_mut(), self.layout, size, position)?;
        Ok(record.map(|(payload_start, len)| payload_start + len))
    }

    /// Cut the file back to `size` bytes
    ///
    /// Does nothing if the store is already that small.
    pub fn truncate(&self, size: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        if size >= inner.size {
            return Ok(());
        }

        let writer = inner.writer.as_mut().ok_or(LogError::Closed)?;
        writer.flush()?;
        writer.get_ref().set_len(size)?;
        inner.size = size;

        Ok(())
    }

    /// Copy raw bytes starting at `offset` into `buf`
    ///
    /// Returns how many bytes were copied; 0 at or past the end of the store.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let writer = inner.writer.as_mut().ok_or(LogError::Closed)?;
        writer.flush()?;

        if offset >= size || buf.is_empty() {
            return Ok(0);
        }

        let n = (size - offset).min(buf.len() as u64) as usize;
        let file = writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf[..n])?;

        Ok(n)
    }

    /// Flush, sync and release the file
    ///
    /// Calling `close` again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(writer) = inner.writer.take() else {
            return Ok(());
        };

        let file = writer.into_inner().map_err(|e| LogError::Sync {
            path: self.path.clone(),
            source: e.into_error(),
        })?;

        file.sync_all().map_err(|source| LogError::Sync {
            path: self.path.clone(),
            source,
        })
    }

    /// Current size in bytes, including buffered writes
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().writer.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Payload start and length of the record at `position`, if it lies
/// entirely within the first `size` bytes
fn locate(
    file: &mut File,
    layout: Layout,
    size: u64,
    position: u64,
) -> Result<Option<(u64, u64)>> {
    let payload_start = match position.checked_add(layout.len_width as u64) {
        Some(start) if start <= size => start,
        _ => return Ok(None),
    };

    file.seek(SeekFrom::Start(position))?;
    let mut prefix = vec![0u8; layout.len_width];
    file.read_exact(&mut prefix)?;
    let len = layout.get_len(&prefix);

    // A prefix pointing past the written bytes is a torn tail, not a record
    match payload_start.checked_add(len) {
        Some(end) if end <= size => Ok(Some((payload_start, len))),
        _ => Ok(None),
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("size", &self.size())
            .finish()
    }
}
