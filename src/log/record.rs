//! Record definition

use bytes::Bytes;

/// A payload read back from the log together with its offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Absolute offset assigned when the record was appended
    pub offset: u64,

    /// The payload bytes exactly as appended
    pub value: Bytes,
}

impl Record {
    pub fn new(offset: u64, value: impl Into<Bytes>) -> Self {
        Self {
            offset,
            value: value.into(),
        }
    }
}
