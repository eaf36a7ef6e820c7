//! Core types and contracts for the Shale datastore
//!
//! This crate defines the vocabulary shared by every layer: keys and
//! the path-hierarchy prefix convention, query specification and
//! execution, result entries, error kinds, and the engine adapter
//! contract that `shale-engine` implements and `shale-store` composes
//! transactions on top of.

pub mod entry;
pub mod error;
pub mod key;
pub mod query;
pub mod traits;

pub use entry::Entry;
pub use error::{Error, Result};
pub use key::Key;
pub use query::{Query, Results};
pub use traits::{Engine, KvIter, ScanRange, Snapshot, WriteBatch};
