//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LogError, Result};
use crate::log::Log;
use crate::protocol::{encode_response, read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// The log served to this client
    log: Arc<Log>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and disables Nagle's algorithm
    pub fn new(stream: TcpStream, log: Arc<Log>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            log,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(LogError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(LogError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Windows reports TimedOut where Unix reports WouldBlock
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command.command_type());

            if let Err(e) = self.respond(command) {
                if let LogError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command against the log and send its response(s)
    fn respond(&mut self, command: Command) -> Result<()> {
        let response = match command {
            Command::Append { payload } => match self.log.append(&payload) {
                Ok(offset) => Response::offset(offset),
                Err(e) => Response::error(&e.to_string()),
            },
            Command::Read { offset } => match self.log.read(offset) {
                Ok(record) => Response::ok(Some(record.value.to_vec())),
                Err(LogError::OffsetOutOfRange { .. }) => Response::out_of_range(),
                Err(e) => Response::error(&e.to_string()),
            },
            Command::Ping => Response::ok(Some(b"PONG".to_vec())),
            Command::Bounds => Response::bounds(self.log.lowest_offset(), self.log.highest_offset()),
            Command::ReadFrom { offset, limit } => return self.stream_records(offset, limit),
        };

        self.send_response(response)
    }

    /// Send one frame per record from `offset` up to the end of the log (or
    /// `limit` records), then END_OF_STREAM with the next offset to ask for
    ///
    /// The end is fixed when the stream starts; records appended meanwhile
    /// are left for the next request.
    fn stream_records(&mut self, offset: u64, limit: u32) -> Result<()> {
        let lowest = self.log.lowest_offset();
        let next = self.log.highest_offset().map_or(lowest, |highest| highest + 1);
        if offset < lowest || offset > next {
            return self.send_response(Response::out_of_range());
        }

        let end = match limit {
            0 => next,
            n => next.min(offset.saturating_add(n as u64)),
        };

        for current in offset..end {
            let response = match self.log.read(current) {
                Ok(record) => Response::record(current, &record.value),
                Err(LogError::OffsetOutOfRange { .. }) => {
                    return self.send_response(Response::out_of_range());
                }
                Err(e) => return self.send_response(Response::error(&e.to_string())),
            };
            self.writer.write_all(&encode_response(&response))?;
        }

        tracing::trace!("Streamed offsets {}..{} to {}", offset, end, self.peer_addr);
        self.send_response(Response::end_of_stream(end))
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
