//! Engine adapter for the Shale datastore
//!
//! This crate provides the concrete implementation of the `shale-core`
//! engine contract: [`RedbEngine`], a thin pass-through to redb with
//! persistent and in-memory instantiations, plus configuration and
//! disk-usage accounting.

pub mod backend;
pub mod config;
pub mod usage;

pub use backend::RedbEngine;
pub use config::EngineConfig;
