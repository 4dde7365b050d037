//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::Connection;
use crate::config::Config;
use crate::error::{DocError, Result};
use crate::protocol::{write_response, Response};
use crate::store::Store;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a rejected client gets to read the rejection before the socket closes
const REJECT_LINGER: Duration = Duration::from_secs(1);

/// Loopback TCP server exposing a store over the wire protocol
pub struct Server {
    config: Config,
    store: Box<dyn Store>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Stops a running server from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl Server {
    /// Create a new server with the given config and store
    pub fn new(config: Config, store: Box<dyn Store>) -> Self {
        Self {
            config,
            store,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the listen address, returning the bound socket address
    ///
    /// Useful with port 0 to learn the port the OS picked.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            DocError::Network(format!("cannot listen on {}: {}", self.config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err(DocError::Network("listener not bound".to_string())),
        };

        tracing::info!("Listening on {}", listener.local_addr()?);

        while !self.shutdown.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Cannot configure connection from {}: {}", peer, e);
                        continue;
                    }
                    if self.active.load(Ordering::Acquire) >= self.config.max_connections {
                        tracing::warn!("Rejecting {}: connection limit reached", peer);
                        thread::spawn(move || reject(stream));
                        continue;
                    }
                    self.spawn_connection(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Server shut down");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// A handle that can stop the server while `run` blocks
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn spawn_connection(&self, stream: TcpStream) {
        let store = self.store.duplicate();
        let active = Arc::clone(&self.active);
        let write_ms = self.config.write_timeout_ms;

        active.fetch_add(1, Ordering::AcqRel);
        thread::spawn(move || {
            let result = Connection::new(stream, store).and_then(|mut conn| {
                // Clients may idle between requests; only writes time out
                conn.set_timeouts(0, write_ms)?;
                conn.handle()
            });
            if let Err(e) = result {
                tracing::debug!("Connection ended with error: {}", e);
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Tell an over-limit client why it is being turned away, then close
fn reject(mut stream: TcpStream) {
    let _ = stream.set_write_timeout(Some(REJECT_LINGER));
    if write_response(&mut stream, &Response::error("connection limit reached")).is_err() {
        return;
    }
    let _ = stream.shutdown(Shutdown::Write);

    // Drain until the client hangs up so unread requests do not reset the socket
    // before the rejection is read
    let _ = stream.set_read_timeout(Some(REJECT_LINGER));
    let _ = io::copy(&mut stream, &mut io::sink());
}
