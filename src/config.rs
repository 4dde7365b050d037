//! Configuration for doctxn
//!
//! Centralized configuration with sensible defaults. Every default matches the
//! value the demo program historically hardcoded.

use std::time::Duration;

use crate::error::{DocError, Result};

/// Port used when `address` names only a host
pub const DEFAULT_PORT: u16 = 7017;

/// Main configuration shared by the bootstrapper, the workflow and the server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Target
    // -------------------------------------------------------------------------
    /// Store address: `host` or `host:port`
    pub address: String,

    /// Database holding the collections
    pub db_name: String,

    /// Collection the user records live in
    pub collection: String,

    /// Collection the transaction runner keeps its log in
    pub txn_collection: String,

    // -------------------------------------------------------------------------
    // Bootstrap Configuration
    // -------------------------------------------------------------------------
    /// Fixed delay between connection attempts
    pub retry_delay: Duration,

    /// Per-attempt TCP connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// TCP listen address for the loopback server
    pub listen_addr: String,

    /// Max concurrent client connections accepted by the loopback server
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            db_name: "test".to_string(),
            collection: "users".to_string(),
            txn_collection: "txns".to_string(),
            retry_delay: Duration::from_secs(5),
            connect_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            max_connections: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The store address with the default port filled in
    ///
    /// Accepts `host`, `host:port`, `[v6]`, `[v6]:port` and bare IPv6 literals.
    pub fn socket_address(&self) -> Result<String> {
        let addr = self.address.trim();
        if addr.is_empty() {
            return Err(DocError::Config("store address is empty".to_string()));
        }

        if let Some(rest) = addr.strip_prefix('[') {
            return match rest.split_once(']') {
                Some((_, "")) => Ok(format!("{}:{}", addr, DEFAULT_PORT)),
                Some((_, port)) if port.starts_with(':') => {
                    parse_port(&port[1..])?;
                    Ok(addr.to_string())
                }
                _ => Err(DocError::Config(format!("malformed address: {}", addr))),
            };
        }

        match addr.matches(':').count() {
            0 => Ok(format!("{}:{}", addr, DEFAULT_PORT)),
            1 => {
                let (host, port) = addr.split_once(':').unwrap_or((addr, ""));
                if host.is_empty() {
                    return Err(DocError::Config(format!("missing host in address: {}", addr)));
                }
                parse_port(port)?;
                Ok(addr.to_string())
            }
            // bare IPv6 literal
            _ => Ok(format!("[{}]:{}", addr, DEFAULT_PORT)),
        }
    }

    /// Namespace of the user collection (`db.collection`)
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.db_name, self.collection)
    }
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| DocError::Config(format!("invalid port: {:?}", port)))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store address (`host` or `host:port`)
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the database name
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.config.db_name = name.into();
        self
    }

    /// Set the user collection name
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the transaction log collection name
    pub fn txn_collection(mut self, name: impl Into<String>) -> Self {
        self.config.txn_collection = name.into();
        self
    }

    /// Set the fixed delay between connection attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the per-attempt connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the loopback server listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent server connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
