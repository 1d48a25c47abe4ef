//! Runtime layer for the LRC streaming aggregator.
//!
//! Provides the blob-store abstraction the master store is persisted through,
//! timestamped backups, and the prepare/merge/backup/restore workflow that
//! ties the data layer to a store.

pub mod backups;
pub mod blob_store;
pub mod workflow;

pub use streaming_core as core;
pub use streaming_data as data;
