//! Connection Bootstrapper
//!
//! Opens the startup session, retrying with a fixed delay until the store
//! answers.
//!
//! ## Retry policy
//! - Unlimited attempts, fixed `Config::retry_delay` between them, no backoff
//! - One log line per failed attempt
//! - [`connect`] blocks until it succeeds; [`connect_cancellable`] also stops
//!   when its [`CancelToken`] fires

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{DocError, Result};
use crate::network::RemoteStore;
use crate::session::Session;
use crate::store::MemoryStore;

/// Something that can open a session on a store
pub trait Connector {
    /// Make one connection attempt
    fn dial(&self, config: &Config) -> Result<Session>;
}

/// Connects over TCP to `config.address`
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn dial(&self, config: &Config) -> Result<Session> {
        let store = RemoteStore::connect(config)?;
        Ok(Session::new(Box::new(store)))
    }
}

/// Opens sessions on an in-process store
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.share(),
        }
    }
}

impl Connector for MemoryConnector {
    fn dial(&self, _config: &Config) -> Result<Session> {
        Ok(Session::new(Box::new(self.store.share())))
    }
}

/// Outcome of a successful bootstrap
pub struct Connected {
    pub session: Session,

    /// Attempts that failed before the successful one
    pub failed_attempts: u32,

    /// Time from the first attempt to success
    pub elapsed: Duration,
}

/// Cancellation signal for [`connect_cancellable`]
///
/// Clones share the signal. Cancelling drops the only sender, which wakes
/// every waiter at once.
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `delay`; returns `true` if cancelled meanwhile
    pub fn wait(&self, delay: Duration) -> bool {
        !matches!(
            self.receiver.recv_timeout(delay),
            Err(RecvTimeoutError::Timeout)
        )
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Connect, retrying forever with a fixed delay
///
/// There is no timeout and no way to abort; use [`connect_cancellable`] when
/// the caller needs one.
pub fn connect<C: Connector + ?Sized>(connector: &C, config: &Config) -> Connected {
    let started = Instant::now();
    let mut failed_attempts = 0u32;

    loop {
        match connector.dial(config) {
            Ok(session) => return connected(session, failed_attempts, started),
            Err(e) => {
                failed_attempts = failed_attempts.saturating_add(1);
                log_retry(config, &e);
                thread::sleep(config.retry_delay);
            }
        }
    }
}

/// Connect, retrying with a fixed delay until success or cancellation
pub fn connect_cancellable<C: Connector + ?Sized>(
    connector: &C,
    config: &Config,
    cancel: &CancelToken,
) -> Result<Connected> {
    let started = Instant::now();
    let mut failed_attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(DocError::Cancelled);
        }

        match connector.dial(config) {
            Ok(session) => return Ok(connected(session, failed_attempts, started)),
            Err(e) => {
                failed_attempts = failed_attempts.saturating_add(1);
                log_retry(config, &e);
                if cancel.wait(config.retry_delay) {
                    tracing::info!("connection to {} cancelled", config.address);
                    return Err(DocError::Cancelled);
                }
            }
        }
    }
}

fn log_retry(config: &Config, err: &DocError) {
    tracing::info!(
        "cannot connect to store at {}: {}, retry in {:?}",
        config.address,
        err,
        config.retry_delay
    );
}

fn connected(session: Session, failed_attempts: u32, started: Instant) -> Connected {
    let elapsed = started.elapsed();
    tracing::debug!(failed_attempts, ?elapsed, "store session established");
    Connected {
        session,
        failed_attempts,
        elapsed,
    }
}
