//! Blocking client for the log server

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{LogError, Result};
use crate::log::Record;
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// One connection to a log server; requests are answered in order
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| LogError::Network(format!("failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Append a record, returning its offset
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        self.call(Command::Append {
            payload: payload.to_vec(),
        })?
        .into_offset()
    }

    /// Read the record at `offset`
    pub fn read(&mut self, offset: u64) -> Result<Vec<u8>> {
        let response = self.call(Command::Read { offset })?;
        if response.status == Status::OutOfRange {
            return Err(LogError::OffsetOutOfRange { offset });
        }
        response.into_ok_payload()
    }

    /// Stream records starting at `offset`, at most `limit` of them
    /// (0 = everything up to the end of the log)
    pub fn read_from(&mut self, offset: u64, limit: u32) -> Result<Vec<Record>> {
        write_command(&mut self.writer, &Command::ReadFrom { offset, limit })?;

        let mut records = Vec::new();
        loop {
            let response = read_response(&mut self.reader)?;
            match response.status {
                Status::Ok => {
                    let (offset, value) = response.into_record()?;
                    records.push(Record::new(offset, value));
                }
                Status::EndOfStream => return Ok(records),
                Status::OutOfRange => return Err(LogError::OffsetOutOfRange { offset }),
                Status::Error => {
                    let message = response
                        .payload
                        .map(|p| String::from_utf8_lossy(&p).into_owned())
                        .unwrap_or_default();
                    return Err(LogError::Network(message));
                }
            }
        }
    }

    /// Lowest offset held and the highest one, if any record exists
    pub fn bounds(&mut self) -> Result<(u64, Option<u64>)> {
        self.call(Command::Bounds)?.into_bounds()
    }

    pub fn ping(&mut self) -> Result<()> {
        let payload = self.call(Command::Ping)?.into_ok_payload()?;
        if payload != b"PONG" {
            return Err(LogError::Protocol(format!(
                "unexpected ping reply: {:?}",
                String::from_utf8_lossy(&payload)
            )));
        }
        Ok(())
    }

    fn call(&mut self, command: Command) -> Result<Response> {
        write_command(&mut self.writer, &command)?;
        read_response(&mut self.reader)
    }
}
