//! Log Reader
//!
//! Raw byte stream over every store of the log, for snapshots and bulk
//! transfer. Bytes come out in store format (length-prefixed records),
//! segment after segment in base-offset order.

use std::io::{self, Read};
use std::sync::Arc;

use crate::error::LogError;

use super::Store;

/// Sequential reader over the stores captured by `Log::reader`
///
/// Each store is read up to the size it had when the reader was created,
/// so the stream is finite even while the log keeps growing. `rewind`
/// restarts it from the first byte.
pub struct LogReader {
    parts: Vec<StorePart>,

    /// Index of the part currently being read
    current: usize,
}

struct StorePart {
    store: Arc<Store>,
    position: u64,
    end: u64,
}

impl LogReader {
    pub(crate) fn new(stores: Vec<(Arc<Store>, u64)>) -> Self {
        let parts = stores
            .into_iter()
            .map(|(store, end)| StorePart {
                store,
                position: 0,
                end,
            })
            .collect();

        Self { parts, current: 0 }
    }

    /// Start over from the first byte of the oldest segment
    pub fn rewind(&mut self) {
        for part in &mut self.parts {
            part.position = 0;
        }
        self.current = 0;
    }

    /// Total number of bytes the reader yields from start to end
    pub fn total_len(&self) -> u64 {
        self.parts.iter().map(|p| p.end).sum()
    }

    /// Number of segments covered
    pub fn segment_count(&self) -> usize {
        self.parts.len()
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(part) = self.parts.get_mut(self.current) {
            let remaining = part.end.saturating_sub(part.position);
            if remaining == 0 {
                self.current += 1;
                continue;
            }

            let want = remaining.min(buf.len() as u64) as usize;
            let n = part
                .store
                .read_at(&mut buf[..want], part.position)
                .map_err(into_io_error)?;

            if n == 0 {
                // Store shorter than captured; nothing more to take from it
                self.current += 1;
                continue;
            }

            part.position += n as u64;
            return Ok(n);
        }

        Ok(0)
    }
}

fn into_io_error(e: LogError) -> io::Error {
    match e {
        LogError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader")
            .field("segments", &self.parts.len())
            .field("current", &self.current)
            .field("total_len", &self.total_len())
            .finish()
    }
}
