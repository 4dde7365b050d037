//! Session Module
//!
//! Owned session handles plus the database and collection views built on them.
//!
//! ## Lifecycle
//! - The bootstrap session is created once at startup
//! - `Session::copy` derives a lightweight session with its own store handle
//! - Dropping a session closes its handle; copies never close the original

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::{encode_body, DocumentId, StoredDocument};
use crate::error::{DocError, Result};
use crate::store::Store;

/// An open session on a document store
pub struct Session {
    store: Box<dyn Store>,
}

impl Session {
    /// Wrap an open store handle
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    /// Derive an independently closable session on the same store
    pub fn copy(&self) -> Session {
        Session::new(self.store.duplicate())
    }

    /// View a database by name
    pub fn db(&self, name: &str) -> Database<'_> {
        Database {
            session: self,
            name: name.to_string(),
        }
    }

    pub fn ping(&self) -> Result<()> {
        self.store.ping()
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    /// Release the session now instead of at end of scope
    pub fn close(self) {
        // `Drop` closes the store handle
        drop(self);
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.store.close();
    }
}

/// A database view borrowed from a session
pub struct Database<'s> {
    session: &'s Session,
    name: String,
}

impl<'s> Database<'s> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// View a collection of this database
    pub fn collection(&self, name: &str) -> Collection<'s> {
        Collection {
            session: self.session,
            db: self.name.clone(),
            name: name.to_string(),
        }
    }
}

/// A collection view borrowed from a session
pub struct Collection<'s> {
    session: &'s Session,
    db: String,
    name: String,
}

impl<'s> Collection<'s> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_name(&self) -> &str {
        &self.db
    }

    /// Namespace on the wire: `<db>.<collection>`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.db, self.name)
    }

    /// A sibling collection in the same database
    pub fn sibling(&self, name: &str) -> Collection<'s> {
        Collection {
            session: self.session,
            db: self.db.clone(),
            name: name.to_string(),
        }
    }

    /// Insert a single record outside any transaction
    pub fn insert<T: Serialize>(&self, id: DocumentId, record: &T) -> Result<()> {
        self.insert_stored(id, &StoredDocument::new(encode_body(record)?))
    }

    /// Fetch and decode one record
    pub fn find_one<T: DeserializeOwned>(&self, id: DocumentId) -> Result<Option<T>> {
        match self.get_stored(id)? {
            Some(stored) => Ok(Some(stored.body_as()?)),
            None => Ok(None),
        }
    }

    /// Fetch and decode every record in the collection
    pub fn find_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        Ok(self
            .find_all_with_ids::<T>()?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Like `find_all`, keeping each record's id
    pub fn find_all_with_ids<T: DeserializeOwned>(&self) -> Result<Vec<(DocumentId, T)>> {
        self.find_all_stored()?
            .into_iter()
            .map(|(id, stored)| Ok::<_, DocError>((id, stored.body_as()?)))
            .collect()
    }

    pub fn remove(&self, id: DocumentId) -> Result<bool> {
        self.session.store().remove(&self.full_name(), id)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.session.store().find_all(&self.full_name())?.len())
    }

    // -------------------------------------------------------------------------
    // Envelope-level access (transaction runner)
    // -------------------------------------------------------------------------

    pub(crate) fn insert_stored(&self, id: DocumentId, stored: &StoredDocument) -> Result<()> {
        self.session
            .store()
            .insert(&self.full_name(), id, stored.encode()?)
    }

    pub(crate) fn get_stored(&self, id: DocumentId) -> Result<Option<StoredDocument>> {
        match self.session.store().get(&self.full_name(), id)? {
            Some(bytes) => Ok(Some(StoredDocument::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn find_all_stored(&self) -> Result<Vec<(DocumentId, StoredDocument)>> {
        self.session
            .store()
            .find_all(&self.full_name())?
            .into_iter()
            .map(|(id, bytes)| Ok::<_, DocError>((id, StoredDocument::decode(&bytes)?)))
            .collect()
    }

    /// Raw access for log records, which are not wrapped in an envelope
    pub(crate) fn get_raw(&self, id: DocumentId) -> Result<Option<Vec<u8>>> {
        self.session.store().get(&self.full_name(), id)
    }

    pub(crate) fn insert_raw(&self, id: DocumentId, bytes: Vec<u8>) -> Result<()> {
        self.session.store().insert(&self.full_name(), id, bytes)
    }

    pub(crate) fn replace_raw(&self, id: DocumentId, bytes: Vec<u8>) -> Result<()> {
        self.session.store().replace(&self.full_name(), id, bytes)
    }

    pub(crate) fn find_all_raw(&self) -> Result<Vec<(DocumentId, Vec<u8>)>> {
        self.session.store().find_all(&self.full_name())
    }
}
