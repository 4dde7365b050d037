//! Network Module
//!
//! TCP client and loopback server.
//!
//! ## Architecture
//! - `RemoteStore`: one socket per store handle, requests serialized by a mutex
//! - `Server`: single acceptor loop, one thread per connection
//! - Commands routed through [`execute`] against any [`crate::store::Store`]

mod client;
mod connection;
mod server;

pub use client::RemoteStore;
pub use connection::{execute, Connection};
pub use server::{Server, ShutdownHandle};
