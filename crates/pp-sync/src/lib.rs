//! pp-sync
//!
//! One sync run: initialize the upstream and both stores, reconcile every
//! collection against the stored snapshot, fan the resulting writes out, and
//! report what happened.
//!
//! Initialization is all-or-nothing. Writes are not: a failed write is
//! recorded against its collection and its siblings carry on.

mod report;
mod runner;
mod writes;

pub use report::{
    CollectionSummary, InitError, RunReport, RunStatus, RunSummary, StoreRole, SyncResult,
    WriteFailure, WriteOperation,
};
pub use runner::SyncRunner;
