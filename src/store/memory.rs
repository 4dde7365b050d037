//! In-memory store
//!
//! BTreeMap-per-namespace store behind a shared RwLock. Backs the loopback
//! server, the tests and the benches.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::Store;
use crate::document::DocumentId;
use crate::error::{DocError, Result};

type Namespaces = HashMap<String, BTreeMap<DocumentId, Vec<u8>>>;

/// In-memory document store handle
pub struct MemoryStore {
    /// Documents shared by every handle on this store
    data: Arc<RwLock<Namespaces>>,

    /// Closed flag for this handle only
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    /// Another open handle on the same data
    pub fn share(&self) -> MemoryStore {
        Self {
            data: Arc::clone(&self.data),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of documents in a namespace
    pub fn document_count(&self, namespace: &str) -> usize {
        self.data.read().get(namespace).map_or(0, |docs| docs.len())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DocError::SessionClosed);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    fn insert(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()> {
        self.ensure_open()?;

        let mut data = self.data.write();
        let docs = data.entry(namespace.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(DocError::DuplicateKey {
                namespace: namespace.to_string(),
                id,
            });
        }
        docs.insert(id, document);
        Ok(())
    }

    fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self
            .data
            .read()
            .get(namespace)
            .and_then(|docs| docs.get(&id).cloned()))
    }

    fn replace(&self, namespace: &str, id: DocumentId, document: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.data
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(id, document);
        Ok(())
    }

    fn remove(&self, namespace: &str, id: DocumentId) -> Result<bool> {
        self.ensure_open()?;
        Ok(self
            .data
            .write()
            .get_mut(namespace)
            .map_or(false, |docs| docs.remove(&id).is_some()))
    }

    fn find_all(&self, namespace: &str) -> Result<Vec<(DocumentId, Vec<u8>)>> {
        self.ensure_open()?;
        Ok(self
            .data
            .read()
            .get(namespace)
            .map(|docs| docs.iter().map(|(id, doc)| (*id, doc.clone())).collect())
            .unwrap_or_default())
    }

    fn duplicate(&self) -> Box<dyn Store> {
        Box::new(self.share())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
