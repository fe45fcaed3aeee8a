//! # Registry
//!
//! Candidate numbering and workflow progress.
//!
//! Two pieces live here:
//! - [`counter`]: the Sequence Allocator. Mints one NUPCAN per successful registration,
//!   backed by a date keyed counter row that is locked for the whole read-increment-write.
//! - [`progress`]: the Progress Tracker. A monotone state machine per NUPCAN
//!   (inscription, documents, payment, done) used to gate navigation. It is a
//!   convenience cache, never the authority on an application's real status.
//!
//! Storage is always injected through the [`counter::CounterStore`] and
//! [`progress::ProgressStore`] traits so the in-memory doubles in [`memory`] can stand
//! in for Postgres and Redis.
use thiserror::Error;

pub mod counter;
pub mod memory;
pub mod nupcan;
pub mod postgres;
pub mod progress;
pub mod redis_store;

pub use counter::{CounterStore, SequenceAllocator};
pub use nupcan::{DateKey, Nupcan};
pub use progress::{Progression, ProgressStore, ProgressTracker, Stage};

#[derive(Error, Debug)]
pub enum RegistryError {
    /// Lock wait timeout or failed transaction while incrementing. Retryable by the caller.
    #[error("Allocation conflict: {0}")]
    AllocationConflict(String),

    /// Counter table missing. Only seen before the first lazy bootstrap.
    #[error("Counter storage not bootstrapped")]
    StorageBootstrap,

    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Progress storage error: {0}")]
    ProgressStorage(String),

    #[error("Corrupt progression record: {0}")]
    ProgressionCorrupt(#[from] serde_json::Error),
}
