//! Tests for the TCP server and client
//!
//! Each test starts a server on an ephemeral port, talks to it through
//! `Client` and shuts it down again.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use seglog::network::{Client, Server, ShutdownHandle};
use seglog::{Config, Log, LogError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    _temp: TempDir,
    addr: String,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        let temp = TempDir::new().unwrap();
        let config = Config::builder()
            .data_dir(temp.path())
            .listen_addr("127.0.0.1:0")
            .worker_threads(2)
            .max_store_bytes(1024)
            .max_index_bytes(4 * 12)
            .read_timeout_ms(5_000)
            .build();

        let log = Arc::new(Log::open(&config.data_dir, config.segment).unwrap());
        let server = Server::bind(config, log).unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let shutdown = server.shutdown_handle();

        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            _temp: temp,
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn client(&self) -> Client {
        Client::connect(&self.addr).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// Request Tests
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start();
    let mut client = server.client();

    client.ping().unwrap();
}

#[test]
fn test_append_and_read() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.append(b"hello").unwrap(), 0);
    assert_eq!(client.append(b"world").unwrap(), 1);

    assert_eq!(client.read(0).unwrap(), b"hello");
    assert_eq!(client.read(1).unwrap(), b"world");
}

#[test]
fn test_read_out_of_range() {
    let server = TestServer::start();
    let mut client = server.client();

    client.append(b"only").unwrap();

    assert!(matches!(
        client.read(5),
        Err(LogError::OffsetOutOfRange { offset: 5 })
    ));

    // The connection stays usable afterwards
    assert_eq!(client.read(0).unwrap(), b"only");
}

#[test]
fn test_bounds() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.bounds().unwrap(), (0, None));

    for _ in 0..6 {
        client.append(b"record").unwrap();
    }

    assert_eq!(client.bounds().unwrap(), (0, Some(5)));
}

#[test]
fn test_read_from_streams_to_end_of_log() {
    let server = TestServer::start();
    let mut client = server.client();

    // Spans several segments of four records each
    for i in 0..10 {
        client.append(format!("record-{}", i).as_bytes()).unwrap();
    }

    let records = client.read_from(3, 0).unwrap();
    assert_eq!(records.len(), 7);
    for (i, record) in records.iter().enumerate() {
        let offset = 3 + i as u64;
        assert_eq!(record.offset, offset);
        assert_eq!(&record.value[..], format!("record-{}", offset).as_bytes());
    }

    // The connection is ready for ordinary requests afterwards
    assert_eq!(client.append(b"after").unwrap(), 10);
}

#[test]
fn test_read_from_with_limit() {
    let server = TestServer::start();
    let mut client = server.client();

    for i in 0..6 {
        client.append(format!("record-{}", i).as_bytes()).unwrap();
    }

    let records = client.read_from(1, 2).unwrap();
    let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![1, 2]);

    // Limit larger than what is left stops at the end of the log
    assert_eq!(client.read_from(4, 100).unwrap().len(), 2);
}

#[test]
fn test_read_from_end_of_log_is_empty() {
    let server = TestServer::start();
    let mut client = server.client();

    assert!(client.read_from(0, 0).unwrap().is_empty());

    client.append(b"one").unwrap();
    assert!(client.read_from(1, 0).unwrap().is_empty());
}

#[test]
fn test_read_from_beyond_end_is_out_of_range() {
    let server = TestServer::start();
    let mut client = server.client();

    client.append(b"one").unwrap();

    assert!(matches!(
        client.read_from(5, 0),
        Err(LogError::OffsetOutOfRange { offset: 5 })
    ));
    client.ping().unwrap();
}

#[test]
fn test_empty_record() {
    let server = TestServer::start();
    let mut client = server.client();

    let offset = client.append(b"").unwrap();
    assert!(client.read(offset).unwrap().is_empty());
}

#[test]
fn test_multiple_clients_share_offsets() {
    let server = TestServer::start();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let mut client = server.client();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let payload = format!("client{}-{}", t, i);
                        let offset = client.append(payload.as_bytes()).unwrap();
                        (offset, payload)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut appended: Vec<(u64, String)> = Vec::new();
    for handle in handles {
        appended.extend(handle.join().unwrap());
    }

    appended.sort();
    let offsets: Vec<u64> = appended.iter().map(|(o, _)| *o).collect();
    assert_eq!(offsets, (0..100).collect::<Vec<_>>());

    let mut client = server.client();
    for (offset, payload) in appended {
        assert_eq!(client.read(offset).unwrap(), payload.as_bytes());
    }
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_releases_log_for_close() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .listen_addr("127.0.0.1:0")
        .worker_threads(2)
        .read_timeout_ms(5_000)
        .build();
    let segment_config = config.segment;

    let log = Arc::new(Log::open(temp.path(), segment_config).unwrap());
    let server = Server::bind(config, Arc::clone(&log)).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();

    let handle = thread::spawn(move || server.run().unwrap());

    {
        let mut client = Client::connect(addr).unwrap();
        assert_eq!(client.append(b"kept").unwrap(), 0);
    }

    shutdown.shutdown();
    handle.join().unwrap();

    // The server and its workers are gone, so the log can be closed
    let log = Arc::try_unwrap(log).unwrap();
    log.close().unwrap();

    let log = Log::open(temp.path(), segment_config).unwrap();
    assert_eq!(&log.read(0).unwrap().value[..], b"kept");
}
