//! Connection Handler
//!
//! Serves one client connection of the loopback server.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{DocError, Result};
use crate::protocol::{read_command, write_response, Command, Response, MAX_PAYLOAD_SIZE};
use crate::store::Store;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// This connection's handle on the store
    store: Box<dyn Store>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, store: Box<dyn Store>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            store,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
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
    /// Reads commands in a loop and sends responses. Returns when the client
    /// disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(DocError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command.command_type());

            let response = execute(self.store.as_ref(), command);

            if let Err(e) = write_response(&mut self.writer, &response) {
                if let DocError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
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

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.store.close();
    }
}

/// Execute a command against a store and build the response
pub fn execute(store: &dyn Store, command: Command) -> Response {
    let result = match command {
        Command::Ping => store.ping().map(|()| Response::ok(None)),
        Command::Get { namespace, id } => store.get(&namespace, id).map(|doc| match doc {
            Some(doc) => Response::ok(Some(doc)),
            None => Response::not_found(),
        }),
        Command::Insert {
            namespace,
            id,
            document,
        } => store.insert(&namespace, id, document).map(|()| Response::ok(None)),
        Command::Replace {
            namespace,
            id,
            document,
        } => store.replace(&namespace, id, document).map(|()| Response::ok(None)),
        Command::Remove { namespace, id } => store.remove(&namespace, id).map(|removed| {
            if removed {
                Response::ok(None)
            } else {
                Response::not_found()
            }
        }),
        Command::FindAll { namespace } => store
            .find_all(&namespace)
            .and_then(|docs| Ok(Response::ok(Some(bincode::serialize(&docs)?)))),
    };

    match result {
        Ok(response) => match response.payload {
            Some(ref payload) if payload.len() > MAX_PAYLOAD_SIZE as usize => Response::error(
                &format!(
                    "Response payload too large: {} bytes (max {})",
                    payload.len(),
                    MAX_PAYLOAD_SIZE
                ),
            ),
            _ => response,
        },
        Err(DocError::DuplicateKey { .. }) => Response::duplicate(),
        Err(e) => Response::error(&e.to_string()),
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
