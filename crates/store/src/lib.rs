//! Transactional datastore layer for Shale
//!
//! This crate composes the engine adapter into the public datastore
//! abstraction: the [`Datastore`] facade, snapshot-isolated
//! [`Transaction`]s built as a write overlay on a point-in-time read
//! view, write-only [`Batch`]es, and the merged scan feeding
//! transaction queries.

mod batch;
mod datastore;
mod merge;
mod overlay;
mod transaction;

pub use batch::Batch;
pub use datastore::Datastore;
pub use transaction::{Transaction, TxnStatus};
