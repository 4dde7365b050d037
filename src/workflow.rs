//! Transactional Writer/Reader
//!
//! One write-then-read cycle: insert users atomically, then list the
//! collection.

use crate::config::Config;
use crate::document::{DocumentId, TxnId, User};
use crate::error::Result;
use crate::session::Session;
use crate::txn::{Op, Runner};

/// The records the demo program inserts
pub fn demo_users() -> Vec<User> {
    vec![User::new("alice@gmail.com"), User::new("bob@gmail.com")]
}

/// Insert `users` in one transaction and return every user in the collection
///
/// Works on a derived session that is released on every exit path; the
/// caller's session stays open.
pub fn insert_and_list(session: &Session, config: &Config, users: &[User]) -> Result<Vec<User>> {
    let session = session.copy();
    let db = session.db(&config.db_name);
    let collection = db.collection(&config.collection);

    let ops = users
        .iter()
        .map(|user| Op::insert(&config.collection, DocumentId::new(), user))
        .collect::<Result<Vec<_>>>()?;

    let runner = Runner::new(db.collection(&config.txn_collection));
    let txn = runner.run(ops, Some(TxnId::new()), None)?;
    tracing::info!(%txn, inserted = users.len(), "transaction committed to {}", collection.full_name());

    let all = collection.find_all()?;
    Ok(all)
}
