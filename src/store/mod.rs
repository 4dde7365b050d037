//! Store Module
//!
//! The seam between this crate and the document store.
//!
//! ## Responsibilities
//! - Per-document reads and writes addressed by namespace + id
//! - Insert-if-absent semantics (`DuplicateKey` on an existing id)
//! - Independently closable handles (`duplicate` / `close`)
//!
//! A store only guarantees atomicity for a single document. Multi-document
//! atomicity is layered on top by [`crate::txn::Runner`].

mod memory;

pub use memory::MemoryStore;

use crate::document::DocumentId;
use crate::error::Result;

/// A handle on a document store
///
/// Handles are cheap to duplicate; each duplicate can be closed without
/// affecting the handle it was made from.
pub trait Store: Send + Sync {
    /// Round-trip health check
    fn ping(&self) -> Result<()>;

    /// Insert a document; fails with `DuplicateKey` when the id exists
    fn insert(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()>;

    /// Fetch a document by id
    fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite a document
    fn replace(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()>;

    /// Remove a document, returning whether it existed
    fn remove(&self, namespace: &str, id: DocumentId) -> Result<bool>;

    /// Every document in a namespace
    fn find_all(&self, namespace: &str) -> Result<Vec<(DocumentId, Vec<u8>)>>;

    /// A new, independently closable handle on the same store
    fn duplicate(&self) -> Box<dyn Store>;

    /// Release this handle; later calls fail with `SessionClosed`
    fn close(&self);

    fn is_closed(&self) -> bool;
}
