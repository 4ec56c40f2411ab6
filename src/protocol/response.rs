//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{LogError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    OutOfRange = 0x01,
    Error = 0x02,
    EndOfStream = 0x03,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (offset, record, bounds or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK response carrying an 8-byte offset
    pub fn offset(offset: u64) -> Self {
        Self::ok(Some(offset.to_be_bytes().to_vec()))
    }

    /// OK response carrying the lowest offset and, if any, the highest
    pub fn bounds(lowest: u64, highest: Option<u64>) -> Self {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&lowest.to_be_bytes());
        if let Some(highest) = highest {
            payload.extend_from_slice(&highest.to_be_bytes());
        }
        Self::ok(Some(payload))
    }

    /// One record of a READ_FROM stream: offset (8) followed by the record
    pub fn record(offset: u64, value: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(8 + value.len());
        payload.extend_from_slice(&offset.to_be_bytes());
        payload.extend_from_slice(value);
        Self::ok(Some(payload))
    }

    /// Last frame of a READ_FROM stream, carrying the next offset to ask for
    pub fn end_of_stream(next_offset: u64) -> Self {
        Self {
            status: Status::EndOfStream,
            payload: Some(next_offset.to_be_bytes().to_vec()),
        }
    }

    /// Create an OUT_OF_RANGE response
    pub fn out_of_range() -> Self {
        Self {
            status: Status::OutOfRange,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Interpret an APPEND response
    pub fn into_offset(self) -> Result<u64> {
        let payload = self.into_ok_payload()?;
        let bytes: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
            LogError::Protocol(format!("expected 8-byte offset, got {} bytes", payload.len()))
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Interpret one READ_FROM stream frame
    pub fn into_record(self) -> Result<(u64, Vec<u8>)> {
        let mut payload = self.into_ok_payload()?;
        if payload.len() < 8 {
            return Err(LogError::Protocol(format!(
                "expected offset-prefixed record, got {} bytes",
                payload.len()
            )));
        }
        let value = payload.split_off(8);
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&payload);
        Ok((u64::from_be_bytes(offset), value))
    }

    /// Interpret a BOUNDS response
    pub fn into_bounds(self) -> Result<(u64, Option<u64>)> {
        let payload = self.into_ok_payload()?;
        let read_u64 = |bytes: &[u8]| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        };

        match payload.len() {
            8 => Ok((read_u64(&payload), None)),
            16 => Ok((read_u64(&payload[..8]), Some(read_u64(&payload[8..])))),
            n => Err(LogError::Protocol(format!(
                "expected 8 or 16 bytes of bounds, got {}",
                n
            ))),
        }
    }

    /// Payload of an OK response; other statuses become errors
    pub fn into_ok_payload(self) -> Result<Vec<u8>> {
        match self.status {
            Status::Ok => Ok(self.payload.unwrap_or_default()),
            Status::OutOfRange => Err(LogError::Protocol("offset out of range".to_string())),
            Status::EndOfStream => Err(LogError::Protocol("unexpected end of stream".to_string())),
            Status::Error => {
                let message = self
                    .payload
                    .map(|p| String::from_utf8_lossy(&p).into_owned())
                    .unwrap_or_default();
                Err(LogError::Network(message))
            }
        }
    }
}
