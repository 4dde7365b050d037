//! # doctxn
//!
//! A document store client built around two pieces:
//! - A startup bootstrapper that retries the connection with a fixed delay
//!   until the store answers
//! - A transaction runner that applies several document writes all or
//!   nothing, using a staged-operation log on a store that only guarantees
//!   single-document atomicity
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Bootstrapper                              │
//! │            (fixed-delay retry, cancellable)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Session
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Writer / Reader                              │
//! │        (derived session, txn runner, read-all)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ RemoteStore │          │ MemoryStore │
//!   │   (TCP)     │          │ (in-proc)   │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Server    │
//!   │ (loopback)  │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod document;
pub mod protocol;
pub mod store;
pub mod network;
pub mod session;
pub mod txn;
pub mod bootstrap;
pub mod workflow;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DocError, Result};
pub use config::Config;
pub use document::{DocumentId, TxnId, User};
pub use session::{Collection, Database, Session};
pub use store::{MemoryStore, Store};
pub use bootstrap::{connect, connect_cancellable, CancelToken, Connected, Connector, TcpConnector};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of doctxn
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
