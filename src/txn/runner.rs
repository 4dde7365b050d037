//! Transaction runner
//!
//! Drives log records through their state machine against the store.

use std::collections::HashMap;

use super::{Assertion, Op, OpKind, TxnRecord, TxnState};
use crate::document::{DocumentId, StoredDocument, TxnId};
use crate::error::{DocError, Result};
use crate::session::Collection;

/// Applies transactions through a log collection
///
/// Op collections are resolved in the same database as the log collection.
pub struct Runner<'s> {
    log: Collection<'s>,
}

impl<'s> Runner<'s> {
    /// Create a runner that keeps its log in `log`
    pub fn new(log: Collection<'s>) -> Self {
        Self { log }
    }

    /// Name of the log collection
    pub fn log_name(&self) -> &str {
        self.log.name()
    }

    /// Run `ops` as one transaction
    ///
    /// A fresh id is generated when `id` is `None`. Returns the transaction id
    /// once every op is applied, or `TxnAborted` if a precondition failed, in
    /// which case no op was applied.
    pub fn run(&self, ops: Vec<Op>, id: Option<TxnId>, info: Option<Vec<u8>>) -> Result<TxnId> {
        let id = id.unwrap_or_else(TxnId::new);
        let record = TxnRecord::new(id, ops, info);

        self.log.insert_raw(id, record.encode()?)?;
        tracing::debug!(txn = %id, ops = record.ops.len(), "transaction logged");

        let record = self.drive(record)?;
        match record.state {
            TxnState::Applied => Ok(id),
            _ => Err(DocError::TxnAborted {
                id,
                reason: record.reason.unwrap_or_default(),
            }),
        }
    }

    /// Drive one logged transaction to a final state
    pub fn resume(&self, id: TxnId) -> Result<TxnState> {
        let record = self.load(id)?.ok_or(DocError::NotFound)?;
        Ok(self.drive(record)?.state)
    }

    /// Drive every unfinished transaction in the log
    ///
    /// A transaction that cannot make progress is logged and left in place;
    /// the others are still driven. Returns the number that reached a final
    /// state.
    pub fn resume_all(&self) -> Result<usize> {
        let mut pending = Vec::new();
        for (_, bytes) in self.log.find_all_raw()? {
            let record = TxnRecord::decode(&bytes)?;
            if !record.state.is_final() {
                pending.push(record);
            }
        }

        let mut completed = 0;
        for record in pending {
            let id = record.id;
            tracing::info!(txn = %id, state = ?record.state, "resuming transaction");
            match self.drive(record) {
                Ok(_) => completed += 1,
                Err(e) => tracing::warn!(txn = %id, error = %e, "cannot resume transaction"),
            }
        }

        Ok(completed)
    }

    /// Current state of a logged transaction
    pub fn state(&self, id: TxnId) -> Result<Option<TxnState>> {
        Ok(self.load(id)?.map(|record| record.state))
    }

    // =========================================================================
    // State machine
    // =========================================================================

    fn load(&self, id: TxnId) -> Result<Option<TxnRecord>> {
        match self.log.get_raw(id)? {
            Some(bytes) => Ok(Some(TxnRecord::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn drive(&self, mut record: TxnRecord) -> Result<TxnRecord> {
        loop {
            match record.state {
                TxnState::Preparing => match self.check(&record)? {
                    None => self.transition(&mut record, TxnState::Prepared, None)?,
                    Some(reason) => {
                        tracing::warn!(txn = %record.id, %reason, "transaction aborted");
                        self.transition(&mut record, TxnState::Aborted, Some(reason))?;
                    }
                },
                TxnState::Prepared => {
                    self.apply(&mut record)?;
                    self.transition(&mut record, TxnState::Applied, None)?;
                }
                TxnState::Applied | TxnState::Aborted => return Ok(record),
            }
        }
    }

    fn transition(
        &self,
        record: &mut TxnRecord,
        state: TxnState,
        reason: Option<String>,
    ) -> Result<()> {
        record.state = state;
        record.reason = reason;
        self.log.replace_raw(record.id, record.encode()?)?;
        tracing::debug!(txn = %record.id, ?state, "transaction state changed");
        Ok(())
    }

    /// Check every precondition, returning the first violation
    ///
    /// Earlier ops of the same transaction are taken into account, so two
    /// inserts of one id conflict even when the store has neither. Documents
    /// written by another unfinished transaction are off limits until it
    /// completes.
    fn check(&self, record: &TxnRecord) -> Result<Option<String>> {
        let staged = self.staged_by_pending(record.id)?;
        let mut present: HashMap<(&str, DocumentId), bool> = HashMap::new();

        for op in &record.ops {
            if op.kind().writes() {
                if let Some(owner) = staged.get(&(op.collection().to_string(), op.id())) {
                    return Ok(Some(format!(
                        "document {} in {} is staged by pending transaction {}",
                        op.id(),
                        op.collection(),
                        owner
                    )));
                }
            }

            let key = (op.collection(), op.id());
            let exists = match present.get(&key) {
                Some(exists) => *exists,
                None => self.log.sibling(op.collection()).get_raw(op.id())?.is_some(),
            };

            let violation = match op.kind() {
                OpKind::Insert(_) if exists => Some("already exists"),
                OpKind::Assert(Assertion::DocExists) if !exists => Some("is missing"),
                OpKind::Assert(Assertion::DocMissing) if exists => Some("exists"),
                _ => None,
            };
            if let Some(what) = violation {
                return Ok(Some(format!(
                    "document {} in {} {}",
                    op.id(),
                    op.collection(),
                    what
                )));
            }

            let after = match op.kind() {
                OpKind::Insert(_) => true,
                OpKind::Remove => false,
                OpKind::Assert(_) => exists,
            };
            present.insert(key, after);
        }

        Ok(None)
    }

    /// Documents written by unfinished transactions other than `current`
    fn staged_by_pending(&self, current: TxnId) -> Result<HashMap<(String, DocumentId), TxnId>> {
        let mut staged = HashMap::new();
        for (id, bytes) in self.log.find_all_raw()? {
            if id == current {
                continue;
            }
            let record = TxnRecord::decode(&bytes)?;
            if record.state.is_final() {
                continue;
            }
            for op in record.ops.iter().filter(|op| op.kind().writes()) {
                staged.insert((op.collection().to_string(), op.id()), record.id);
            }
        }
        Ok(staged)
    }

    /// Apply the ops not yet applied, recording progress after each one
    ///
    /// Inserts carry the transaction id, so an insert re-run after a crash
    /// between the write and the progress record is recognised and skipped.
    /// A remove re-run in that same window deletes whatever holds the id at
    /// that point.
    fn apply(&self, record: &mut TxnRecord) -> Result<()> {
        let record_id = record.id;
        for index in record.applied..record.ops.len() {
            let op = &record.ops[index];
            let collection = self.log.sibling(op.collection());
            match op.kind() {
                OpKind::Insert(body) => match collection.get_stored(op.id())? {
                    Some(existing) if existing.txn == Some(record_id) => {
                        tracing::trace!(txn = %record_id, doc = %op.id(), "insert already applied");
                    }
                    Some(_) => return Err(conflict(record_id, op)),
                    None => {
                        let stored = StoredDocument::inserted_by(record_id, body.clone());
                        match collection.insert_stored(op.id(), &stored) {
                            Ok(()) => {}
                            Err(DocError::DuplicateKey { .. }) => {
                                return Err(conflict(record_id, op))
                            }
                            Err(e) => return Err(e),
                        }
                    }
                },
                OpKind::Remove => {
                    collection.remove(op.id())?;
                }
                OpKind::Assert(_) => {}
            }

            record.applied = index + 1;
            self.log.replace_raw(record_id, record.encode()?)?;
        }
        Ok(())
    }
}

fn conflict(txn: TxnId, op: &Op) -> DocError {
    DocError::TxnConflict {
        id: txn,
        reason: format!(
            "document {} in {} was written by another writer after prepare",
            op.id(),
            op.collection()
        ),
    }
}
