//! On-disk field widths
//!
//! Every integer written by the store and the index is big-endian. The widths
//! are carried in a `Layout` value handed to each constructor instead of being
//! global constants, so logs with different encodings can share a process.

use bytes::{Buf, BufMut};

use crate::error::{LogError, Result};

/// Width of the store's record length prefix
pub const LEN_WIDTH: usize = 8;

/// Width of an index entry's relative offset
pub const OFFSET_WIDTH: usize = 4;

/// Width of an index entry's store position
pub const POSITION_WIDTH: usize = 8;

/// Field widths used by store records and index entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Bytes of the length prefix in front of every store record
    pub len_width: usize,

    /// Bytes of the relative offset in an index entry (at most 4)
    pub offset_width: usize,

    /// Bytes of the store position in an index entry
    pub position_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Layout {
    /// 8-byte length prefix, 4 + 8 byte index entries
    pub const DEFAULT: Layout = Layout {
        len_width: LEN_WIDTH,
        offset_width: OFFSET_WIDTH,
        position_width: POSITION_WIDTH,
    };

    /// Size of one index entry in bytes
    pub fn entry_width(&self) -> u64 {
        (self.offset_width + self.position_width) as u64
    }

    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, width: usize, max: usize| {
            if width == 0 || width > max {
                Err(LogError::Config(format!(
                    "{} must be between 1 and {} bytes, got {}",
                    name, max, width
                )))
            } else {
                Ok(())
            }
        };

        check("len_width", self.len_width, 8)?;
        check("offset_width", self.offset_width, 4)?;
        check("position_width", self.position_width, 8)
    }

    /// Largest payload length the length prefix can describe
    pub fn max_record_len(&self) -> u64 {
        max_for_width(self.len_width)
    }

    /// Largest relative offset an index entry can hold
    pub fn max_relative_offset(&self) -> u64 {
        max_for_width(self.offset_width)
    }

    /// Largest store position an index entry can hold
    pub fn max_position(&self) -> u64 {
        max_for_width(self.position_width)
    }

    pub(crate) fn put_len(&self, buf: &mut impl BufMut, len: u64) {
        buf.put_uint(len, self.len_width);
    }

    pub(crate) fn get_len(&self, mut buf: &[u8]) -> u64 {
        buf.get_uint(self.len_width)
    }

    /// Encode one index entry into `slot`, which must be `entry_width` long
    pub(crate) fn put_entry(&self, mut slot: &mut [u8], offset: u32, position: u64) {
        slot.put_uint(offset as u64, self.offset_width);
        slot.put_uint(position, self.position_width);
    }

    /// Decode one index entry from `slot`
    pub(crate) fn get_entry(&self, mut slot: &[u8]) -> (u32, u64) {
        let offset = slot.get_uint(self.offset_width) as u32;
        let position = slot.get_uint(self.position_width);
        (offset, position)
    }
}

fn max_for_width(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}
