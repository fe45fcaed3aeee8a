//! In-process stores. Used by tests and by `PROGRESS_BACKEND=memory` for local runs.
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{RegistryError, counter::CounterStore, nupcan::DateKey, progress::ProgressStore};

/// Counter rows behind one mutex. `None` stands for "table not created yet".
#[derive(Default)]
pub struct MemoryCounterStore {
    rows: Mutex<Option<HashMap<DateKey, u64>>>,
    bootstrap_calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl MemoryCounterStore {
    pub fn bootstrapped() -> Self {
        Self {
            rows: Mutex::new(Some(HashMap::new())),
            ..Self::default()
        }
    }

    pub async fn is_bootstrapped(&self) -> bool {
        self.rows.lock().await.is_some()
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstrap_calls.load(Ordering::Relaxed)
    }

    /// Makes the next `increment` fail as if the row lock timed out.
    pub fn fail_next_increment(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, date_key: &DateKey) -> Result<u64, RegistryError> {
        let mut rows = self.rows.lock().await;

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RegistryError::AllocationConflict(
                "lock timeout (simulated)".to_string(),
            ));
        }

        let rows = rows.as_mut().ok_or(RegistryError::StorageBootstrap)?;
        let counter = rows.entry(date_key.clone()).or_insert(0);
        *counter += 1;

        Ok(*counter)
    }

    async fn bootstrap(&self) -> Result<(), RegistryError> {
        self.bootstrap_calls.fetch_add(1, Ordering::Relaxed);
        self.rows.lock().await.get_or_insert_with(HashMap::new);

        Ok(())
    }

    async fn reset(&self, date_key: &DateKey) -> Result<(), RegistryError> {
        if let Some(rows) = self.rows.lock().await.as_mut() {
            rows.remove(date_key);
        }

        Ok(())
    }

    async fn peek(&self, date_key: &DateKey) -> Result<Option<u64>, RegistryError> {
        Ok(self
            .rows
            .lock()
            .await
            .as_ref()
            .and_then(|rows| rows.get(date_key).copied()))
    }
}

/// Key-value double for the progress namespace.
#[derive(Default)]
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryProgressStore {
    /// Writes a raw value, bypassing serialization. Lets tests plant corrupt records.
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Makes every subsequent call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(RegistryError::ProgressStorage(
                "backend unavailable (simulated)".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load(&self, key: &str) -> Result<Option<String>, RegistryError> {
        self.check_available()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: String) -> Result<(), RegistryError> {
        self.check_available()?;
        self.entries.lock().await.insert(key.to_string(), value);

        Ok(())
    }
}
