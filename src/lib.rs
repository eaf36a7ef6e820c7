//! Shale: a transactional key-value datastore layered over an ordered
//! storage engine
//!
//! Shale composes an embedded ordered store (redb) into a richer
//! datastore abstraction: snapshot-isolated transactions implemented as
//! a write overlay on a point-in-time read view, a query engine with
//! prefix scans, filters, ordering, offset and limit, atomic batch
//! writes, safe shutdown under concurrent in-flight operations, and
//! disk-usage accounting.
//!
//! # Quick Start
//!
//! ```
//! use shale::{Datastore, Key, Query};
//!
//! # fn main() -> shale::Result<()> {
//! // In-memory store; use Datastore::open(dir) for a persistent one.
//! let ds = Datastore::in_memory()?;
//!
//! ds.put(&Key::new("/users/alice"), b"alice")?;
//! ds.put(&Key::new("/users/bob"), b"bob")?;
//!
//! // Snapshot-isolated transaction with read-your-own-writes.
//! let mut txn = ds.new_transaction(false)?;
//! txn.put(&Key::new("/users/carol"), b"carol")?;
//! assert!(txn.has(&Key::new("/users/carol"))?);
//! txn.commit()?;
//!
//! // Prefix queries return the subtree below a key.
//! let users = ds.query(Query::new().with_prefix("/users"))?.rest()?;
//! assert_eq!(users.len(), 3);
//! ds.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `shale-core`: keys, entries, errors, the query engine, and the
//!   engine adapter contract
//! - `shale-engine`: the redb-backed engine adapter
//! - `shale-store`: transactions, batches and the [`Datastore`] facade

pub use shale_core::entry::Entry;
pub use shale_core::error::{Error, Result};
pub use shale_core::key::Key;
pub use shale_core::query::{
    CompareOp, FilterKeyCompare, FilterKeyPrefix, FilterValueCompare, OrderByKey,
    OrderByKeyDescending, OrderByValue, Query, QueryFilter, QueryOrder, Results,
};
pub use shale_core::traits::{BatchOp, Engine, KvIter, ScanRange, Snapshot, WriteBatch};
pub use shale_engine::{EngineConfig, RedbEngine};
pub use shale_store::{Batch, Datastore, Transaction, TxnStatus};
