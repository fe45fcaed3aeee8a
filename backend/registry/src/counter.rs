//! # Sequence Allocator
//!
//! Issues NUPCANs per calendar day.
//!
//! ## Counter record
//! - `date_key` (`MM-DD`, unique) to `counter` (integer, first issuance is 1)
//! - At most one row per key, counter only ever moves up within a day
//!
//! ## Allocation
//! 1. Compute today's `date_key`.
//! 2. Inside one transaction, read the row with a write lock, increment (or insert 1), commit.
//! 3. Format `GABCONCOURS-<date_key>-<value>`.
//!
//! The row lock is what serializes concurrent allocators, not anything in-process,
//! so several server replicas can share one database. Different keys never contend.
//!
//! If the counter table does not exist yet the store reports
//! [`RegistryError::StorageBootstrap`]; the allocator creates it and retries once.
//! Lock timeouts surface as [`RegistryError::AllocationConflict`] and are left for
//! the HTTP caller to retry. A failed allocation never consumes a number.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use crate::{
    RegistryError,
    nupcan::{DateKey, Nupcan},
};

/// Transactional access to the date keyed counter rows.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Locks the row for `date_key`, bumps it (or creates it at 1) and returns the new value.
    ///
    /// Must return [`RegistryError::StorageBootstrap`] when the backing table is missing.
    async fn increment(&self, date_key: &DateKey) -> Result<u64, RegistryError>;

    /// Creates the counter table. Safe to call repeatedly.
    async fn bootstrap(&self) -> Result<(), RegistryError>;

    /// Deletes the row for `date_key`. Not safe against a concurrent `increment` on the same key.
    async fn reset(&self, date_key: &DateKey) -> Result<(), RegistryError>;

    /// Current value without taking a lock.
    async fn peek(&self, date_key: &DateKey) -> Result<Option<u64>, RegistryError>;
}

#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub async fn allocate(&self) -> Result<Nupcan, RegistryError> {
        self.allocate_on(Local::now().date_naive()).await
    }

    #[instrument(skip(self))]
    pub async fn allocate_on(&self, date: NaiveDate) -> Result<Nupcan, RegistryError> {
        let date_key = DateKey::from(date);

        let sequence = match self.store.increment(&date_key).await {
            Err(RegistryError::StorageBootstrap) => {
                warn!("Counter storage missing, bootstrapping");
                self.store.bootstrap().await?;

                self.store
                    .increment(&date_key)
                    .await
                    .map_err(|e| match e {
                        RegistryError::StorageBootstrap => RegistryError::AllocationConflict(
                            "counter storage still missing after bootstrap".to_string(),
                        ),
                        other => other,
                    })?
            }
            result => result?,
        };

        let nupcan = Nupcan::new(date_key, sequence);
        info!("Allocated {nupcan}");

        Ok(nupcan)
    }

    pub async fn reset_for_date(&self, date_key: &DateKey) -> Result<(), RegistryError> {
        warn!("Resetting counter for {date_key}");
        self.store.reset(date_key).await
    }

    pub async fn current(&self, date_key: &DateKey) -> Result<Option<u64>, RegistryError> {
        self.store.peek(date_key).await
    }

    pub async fn bootstrap(&self) -> Result<(), RegistryError> {
        self.store.bootstrap().await
    }
}
