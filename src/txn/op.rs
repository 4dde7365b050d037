//! Operation definitions
//!
//! Immutable staged mutations consumed by the runner.

use serde::{Deserialize, Serialize};

use crate::document::{encode_body, DocumentId};
use crate::error::Result;

/// Precondition checked while preparing a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assertion {
    DocExists,
    DocMissing,
}

/// What an operation does to its document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    /// Insert the encoded body; the id must not exist yet
    Insert(Vec<u8>),

    /// Remove the document if present
    Remove,

    /// Apply nothing, only gate the transaction
    Assert(Assertion),
}

impl OpKind {
    /// Whether applying this op changes the document
    pub fn writes(&self) -> bool {
        !matches!(self, OpKind::Assert(_))
    }
}

/// A staged mutation against one document of a named collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    collection: String,
    id: DocumentId,
    kind: OpKind,
}

impl Op {
    /// Stage an insert of `record` under `id`
    pub fn insert<T: Serialize>(collection: &str, id: DocumentId, record: &T) -> Result<Self> {
        Ok(Self {
            collection: collection.to_string(),
            id,
            kind: OpKind::Insert(encode_body(record)?),
        })
    }

    pub fn remove(collection: &str, id: DocumentId) -> Self {
        Self {
            collection: collection.to_string(),
            id,
            kind: OpKind::Remove,
        }
    }

    pub fn assert(collection: &str, id: DocumentId, assertion: Assertion) -> Self {
        Self {
            collection: collection.to_string(),
            id,
            kind: OpKind::Assert(assertion),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }
}
