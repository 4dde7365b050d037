//! Remote store client
//!
//! A [`Store`] implementation speaking the wire protocol over TCP.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::document::DocumentId;
use crate::error::{DocError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::store::Store;

/// Socket settings shared by every handle derived from one store
#[derive(Debug, Clone)]
struct Endpoint {
    address: String,
    connect_timeout_ms: u64,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
}

/// Buffered halves of one client socket
struct ClientConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Store handle backed by a TCP connection
///
/// The socket is opened lazily and reopened after a transport error. Every
/// handle returned by `duplicate` owns a separate socket.
pub struct RemoteStore {
    endpoint: Endpoint,
    conn: Mutex<Option<ClientConnection>>,
    closed: AtomicBool,
}

impl RemoteStore {
    /// Open a connection to the store named by `config.address` and ping it
    pub fn connect(config: &Config) -> Result<Self> {
        let endpoint = Endpoint {
            address: config.socket_address()?,
            connect_timeout_ms: config.connect_timeout_ms,
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
        };

        let conn = open_connection(&endpoint)?;
        let store = Self {
            endpoint,
            conn: Mutex::new(Some(conn)),
            closed: AtomicBool::new(false),
        };
        store.ping()?;

        tracing::debug!("Connected to store at {}", store.endpoint.address);
        Ok(store)
    }

    /// Address this handle talks to
    pub fn address(&self) -> &str {
        &self.endpoint.address
    }

    /// Send one command and wait for its response
    fn request(&self, command: &Command) -> Result<Response> {
        if self.is_closed() {
            return Err(DocError::SessionClosed);
        }

        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(open_connection(&self.endpoint)?);
        }

        let result = match guard.as_mut() {
            Some(conn) => write_command(&mut conn.writer, command)
                .and_then(|()| read_response(&mut conn.reader)),
            None => return Err(DocError::SessionClosed),
        };

        match result {
            Ok(response) => Ok(response),
            Err(DocError::Io(e)) => {
                // Drop the socket so the next request reconnects
                *guard = None;
                Err(DocError::Network(format!("{}: {}", self.endpoint.address, e)))
            }
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }
}

impl Store for RemoteStore {
    fn ping(&self) -> Result<()> {
        let response = self.request(&Command::Ping)?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    fn insert(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()> {
        let response = self.request(&Command::Insert {
            namespace: namespace.to_string(),
            id,
            document,
        })?;
        match response.status {
            Status::Ok => Ok(()),
            Status::Duplicate => Err(DocError::DuplicateKey {
                namespace: namespace.to_string(),
                id,
            }),
            _ => Err(unexpected(&response)),
        }
    }

    fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Vec<u8>>> {
        let response = self.request(&Command::Get {
            namespace: namespace.to_string(),
            id,
        })?;
        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            Status::NotFound => Ok(None),
            _ => Err(unexpected(&response)),
        }
    }

    fn replace(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()> {
        let response = self.request(&Command::Replace {
            namespace: namespace.to_string(),
            id,
            document,
        })?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    fn remove(&self, namespace: &str, id: DocumentId) -> Result<bool> {
        let response = self.request(&Command::Remove {
            namespace: namespace.to_string(),
            id,
        })?;
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            _ => Err(unexpected(&response)),
        }
    }

    fn find_all(&self, namespace: &str) -> Result<Vec<(DocumentId, Vec<u8>)>> {
        let response = self.request(&Command::FindAll {
            namespace: namespace.to_string(),
        })?;
        match response.status {
            Status::Ok => match response.payload {
                Some(payload) => Ok(bincode::deserialize(&payload)?),
                None => Ok(Vec::new()),
            },
            _ => Err(unexpected(&response)),
        }
    }

    fn duplicate(&self) -> Box<dyn Store> {
        Box::new(Self {
            endpoint: self.endpoint.clone(),
            conn: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(conn) = self.conn.lock().take() {
            let _ = conn.writer.get_ref().shutdown(Shutdown::Both);
        }
        tracing::trace!("Closed store handle for {}", self.endpoint.address);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Resolve the endpoint and connect to the first address that accepts
fn open_connection(endpoint: &Endpoint) -> Result<ClientConnection> {
    let addrs = endpoint
        .address
        .to_socket_addrs()
        .map_err(|e| DocError::Network(format!("cannot resolve {}: {}", endpoint.address, e)))?;

    let mut last_error = None;
    for addr in addrs {
        let attempt = if endpoint.connect_timeout_ms > 0 {
            TcpStream::connect_timeout(&addr, Duration::from_millis(endpoint.connect_timeout_ms))
        } else {
            TcpStream::connect(addr)
        };
        match attempt {
            Ok(stream) => return configure(stream, endpoint),
            Err(e) => last_error = Some(e),
        }
    }

    Err(DocError::Network(match last_error {
        Some(e) => format!("cannot connect to {}: {}", endpoint.address, e),
        None => format!("no addresses found for {}", endpoint.address),
    }))
}

fn configure(stream: TcpStream, endpoint: &Endpoint) -> Result<ClientConnection> {
    // Disable Nagle's algorithm for low latency
    stream.set_nodelay(true)?;

    if endpoint.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(endpoint.read_timeout_ms)))?;
    }
    if endpoint.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(endpoint.write_timeout_ms)))?;
    }

    let read_stream = stream.try_clone()?;
    Ok(ClientConnection {
        reader: BufReader::new(read_stream),
        writer: BufWriter::new(stream),
    })
}

fn unexpected(response: &Response) -> DocError {
    match response.status {
        Status::Error => DocError::Network(format!("store error: {}", response.message())),
        status => DocError::Protocol(format!("unexpected response status {:?}", status)),
    }
}
