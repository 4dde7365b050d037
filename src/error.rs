//! Error types for doctxn
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::document::DocumentId;

/// Result type alias using DocError
pub type Result<T> = std::result::Result<T, DocError>;

/// Unified error type for doctxn operations
#[derive(Debug, Error)]
pub enum DocError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate key {id} in {namespace}")]
    DuplicateKey { namespace: String, id: DocumentId },

    #[error("Document not found")]
    NotFound,

    #[error("Session is closed")]
    SessionClosed,

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Transaction {id} aborted: {reason}")]
    TxnAborted { id: DocumentId, reason: String },

    #[error("Transaction {id} conflict: {reason}")]
    TxnConflict { id: DocumentId, reason: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for DocError {
    fn from(err: bincode::Error) -> Self {
        DocError::Serialization(err.to_string())
    }
}
