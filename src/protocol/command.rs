//! Command definitions
//!
//! Represents requests from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Append = 0x01,
    Read = 0x02,
    Ping = 0x03,
    Bounds = 0x04,
    ReadFrom = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a record, answered with its offset
    Append { payload: Vec<u8> },

    /// Read the record at an offset
    Read { offset: u64 },

    /// Ping (health check)
    Ping,

    /// Lowest and highest offsets currently held
    Bounds,

    /// Stream records from `offset` onwards, at most `limit` of them
    /// (0 = up to the end of the log)
    ReadFrom { offset: u64, limit: u32 },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Append { .. } => CommandType::Append,
            Command::Read { .. } => CommandType::Read,
            Command::Ping => CommandType::Ping,
            Command::Bounds => CommandType::Bounds,
            Command::ReadFrom { .. } => CommandType::ReadFrom,
        }
    }
}
