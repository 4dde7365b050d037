//! Command definitions
//!
//! Represents requests from clients. Every command that touches documents
//! addresses a namespace of the form `<db>.<collection>`.

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Insert = 0x02,
    Replace = 0x03,
    Remove = 0x04,
    Ping = 0x05,
    FindAll = 0x06,
}

impl CommandType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::Get),
            0x02 => Some(CommandType::Insert),
            0x03 => Some(CommandType::Replace),
            0x04 => Some(CommandType::Remove),
            0x05 => Some(CommandType::Ping),
            0x06 => Some(CommandType::FindAll),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Get a document by id
    Get { namespace: String, id: DocumentId },

    /// Insert a document; fails if the id already exists
    Insert {
        namespace: String,
        id: DocumentId,
        document: Vec<u8>,
    },

    /// Insert or overwrite a document
    Replace {
        namespace: String,
        id: DocumentId,
        document: Vec<u8>,
    },

    /// Remove a document
    Remove { namespace: String, id: DocumentId },

    /// Ping (health check)
    Ping,

    /// List every document of a namespace
    FindAll { namespace: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Insert { .. } => CommandType::Insert,
            Command::Replace { .. } => CommandType::Replace,
            Command::Remove { .. } => CommandType::Remove,
            Command::Ping => CommandType::Ping,
            Command::FindAll { .. } => CommandType::FindAll,
        }
    }
}
