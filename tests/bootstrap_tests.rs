//! Tests for the connection bootstrapper
//!
//! These tests verify:
//! - A reachable store connects without retries
//! - K failed attempts cost about K retry delays, are counted, and log K lines
//! - Cancellation stops the retry loop promptly
//! - TCP bootstrap against the loopback server

use std::cell::Cell;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use doctxn::bootstrap::MemoryConnector;
use doctxn::network::{Server, ShutdownHandle};
use doctxn::{
    connect, connect_cancellable, CancelToken, Config, Connector, DocError, MemoryStore, Session,
    TcpConnector,
};

// =============================================================================
// Helper Functions
// =============================================================================

/// Fails a fixed number of times before handing out sessions
struct FlakyConnector {
    store: MemoryStore,
    failures_left: Cell<u32>,
    dials: Cell<u32>,
}

impl FlakyConnector {
    fn new(failures: u32) -> Self {
        Self {
            store: MemoryStore::new(),
            failures_left: Cell::new(failures),
            dials: Cell::new(0),
        }
    }
}

impl Connector for FlakyConnector {
    fn dial(&self, _config: &Config) -> doctxn::Result<Session> {
        self.dials.set(self.dials.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(DocError::Network("connection refused".to_string()));
        }
        Ok(Session::new(Box::new(self.store.share())))
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn lines_containing(&self, needle: &str) -> usize {
        String::from_utf8_lossy(&self.buf.lock())
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn fast_retry_config() -> Config {
    Config::builder()
        .retry_delay(Duration::from_millis(20))
        .build()
}

fn start_server(listen: &str, store: &MemoryStore) -> (SocketAddr, ShutdownHandle, thread::JoinHandle<()>) {
    let config = Config::builder().listen_addr(listen).build();
    let mut server = Server::new(config, Box::new(store.share()));
    let addr = server.bind().unwrap();
    let handle = server.shutdown_handle();
    let join = thread::spawn(move || server.run().unwrap());
    (addr, handle, join)
}

// =============================================================================
// Retry Policy Tests
// =============================================================================

#[test]
fn test_reachable_store_connects_first_try() {
    let connector = FlakyConnector::new(0);
    let connected = connect(&connector, &fast_retry_config());

    assert_eq!(connected.failed_attempts, 0);
    assert_eq!(connector.dials.get(), 1);
    connected.session.ping().unwrap();
}

#[test]
fn test_retries_until_store_is_reachable() {
    let connector = FlakyConnector::new(3);
    let config = fast_retry_config();

    let started = Instant::now();
    let connected = connect(&connector, &config);

    assert_eq!(connected.failed_attempts, 3);
    assert_eq!(connector.dials.get(), 4);
    assert!(started.elapsed() >= config.retry_delay * 3);
    assert!(connected.elapsed >= config.retry_delay * 3);
    connected.session.ping().unwrap();
}

#[test]
fn test_one_log_line_per_failed_attempt() {
    let connector = FlakyConnector::new(3);
    let config = fast_retry_config();
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let connected = tracing::subscriber::with_default(subscriber, || connect(&connector, &config));

    assert_eq!(connected.failed_attempts, 3);
    assert_eq!(capture.lines_containing("cannot connect to store"), 3);
    assert_eq!(capture.lines_containing("connection refused"), 3);
}

#[test]
fn test_memory_connector_always_connects() {
    let store = MemoryStore::new();
    let connected = connect(&MemoryConnector::new(&store), &Config::default());

    assert_eq!(connected.failed_attempts, 0);
    connected.session.ping().unwrap();
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[test]
fn test_cancellable_connect_succeeds_like_connect() {
    let connector = FlakyConnector::new(2);
    let cancel = CancelToken::new();

    let connected = connect_cancellable(&connector, &fast_retry_config(), &cancel).unwrap();

    assert_eq!(connected.failed_attempts, 2);
    assert!(!cancel.is_cancelled());
}

#[test]
fn test_pre_cancelled_token_never_dials() {
    let connector = FlakyConnector::new(0);
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = connect_cancellable(&connector, &fast_retry_config(), &cancel);

    assert!(matches!(result, Err(DocError::Cancelled)));
    assert_eq!(connector.dials.get(), 0);
}

#[test]
fn test_cancel_interrupts_retry_sleep() {
    let connector = FlakyConnector::new(u32::MAX);
    let config = Config::builder()
        .retry_delay(Duration::from_secs(30))
        .build();
    let cancel = CancelToken::new();

    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let started = Instant::now();
    let result = connect_cancellable(&connector, &config, &cancel);
    canceller.join().unwrap();

    assert!(matches!(result, Err(DocError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(connector.dials.get(), 1);
}

#[test]
fn test_token_wait_times_out_when_not_cancelled() {
    let cancel = CancelToken::new();
    assert!(!cancel.wait(Duration::from_millis(10)));

    cancel.cancel();
    assert!(cancel.is_cancelled());
    assert!(cancel.wait(Duration::from_secs(10)));
}

// =============================================================================
// TCP Bootstrap Tests
// =============================================================================

#[test]
fn test_tcp_connect_to_running_server() {
    let store = MemoryStore::new();
    let (addr, shutdown, join) = start_server("127.0.0.1:0", &store);

    let config = Config::builder()
        .address(addr.to_string())
        .retry_delay(Duration::from_millis(20))
        .build();
    let connected = connect(&TcpConnector, &config);

    assert_eq!(connected.failed_attempts, 0);
    connected.session.ping().unwrap();

    drop(connected);
    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_tcp_connect_waits_for_late_server() {
    // Reserve a free port, then release it so the first attempts are refused
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let listen = format!("127.0.0.1:{}", port);

    let config = Config::builder()
        .address(listen.clone())
        .retry_delay(Duration::from_millis(50))
        .build();
    let connecting = thread::spawn(move || {
        let connected = connect(&TcpConnector, &config);
        connected.session.ping().unwrap();
        connected.failed_attempts
    });

    thread::sleep(Duration::from_millis(200));
    let store = MemoryStore::new();
    let (_, shutdown, join) = start_server(&listen, &store);

    let failed_attempts = connecting.join().unwrap();
    assert!(failed_attempts >= 1);

    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_tcp_connect_rejects_bad_address_and_retries() {
    let config = Config::builder()
        .address("host:notaport")
        .retry_delay(Duration::from_millis(10))
        .build();
    let cancel = CancelToken::new();

    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.cancel();
    });

    let result = connect_cancellable(&TcpConnector, &config, &cancel);
    canceller.join().unwrap();

    assert!(matches!(result, Err(DocError::Cancelled)));
}
