//! Transaction Module
//!
//! All-or-nothing application of several document operations on a store that
//! only guarantees single-document atomicity.
//!
//! ## Protocol
//! 1. Log the transaction as `Preparing` in the log collection
//! 2. Check every precondition, including ids reserved by other unfinished
//!    transactions; on failure mark `Aborted` and stop
//! 3. Mark `Prepared`, then apply the ops in order, saving progress after each
//! 4. Mark `Applied`
//!
//! Nothing touches user documents before the `Prepared` record is durable, so
//! an interrupted transaction is either abortable or can be driven forward
//! with [`Runner::resume`] / [`Runner::resume_all`].

mod op;
mod record;
mod runner;

pub use op::{Assertion, Op, OpKind};
pub use record::{TxnRecord, TxnState};
pub use runner::Runner;
