//! Transaction log records
//!
//! One record per transaction, stored in the runner's log collection and
//! rewritten on every state change.

use serde::{Deserialize, Serialize};

use super::Op;
use crate::document::TxnId;
use crate::error::Result;

/// Transaction states
///
/// ```text
/// Preparing ──► Prepared ──► Applied
///     │
///     └───────► Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnState {
    /// Logged, preconditions not yet checked
    Preparing,

    /// Preconditions held; ops may be partially applied
    Prepared,

    /// Every op applied
    Applied,

    /// A precondition failed; no op was applied
    Aborted,
}

impl TxnState {
    pub fn is_final(self) -> bool {
        matches!(self, TxnState::Applied | TxnState::Aborted)
    }
}

/// A staged-operation log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxnRecord {
    pub id: TxnId,
    pub state: TxnState,
    pub ops: Vec<Op>,

    /// Number of leading ops already applied while `Prepared`
    pub applied: usize,

    /// Opaque caller data stored alongside the transaction
    pub info: Option<Vec<u8>>,

    /// Why the transaction aborted
    pub reason: Option<String>,
}

impl TxnRecord {
    pub fn new(id: TxnId, ops: Vec<Op>, info: Option<Vec<u8>>) -> Self {
        Self {
            id,
            state: TxnState::Preparing,
            ops,
            applied: 0,
            info,
            reason: None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
