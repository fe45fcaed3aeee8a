//! # Counter Maintenance
//!
//! Operator side of the Sequence Allocator. Nothing here is reachable over HTTP.
//!
//! ## Commands
//! - `bootstrap`: create `nupcan_counters` ahead of the first registration
//! - `reset <MM-DD>`: drop a day's counter row so numbering restarts at 1
//! - `peek [MM-DD]`: print the last issued number for a day (today by default)
//!
//! ## Notes
//! - `reset` races with live allocations for the same day. Only run it when
//!   registrations for that day are closed, or on a test database.
//! - Resetting a day that already issued NUPCANs will hand the same numbers out again.
use std::sync::Arc;

use anyhow::Result;
use registry::{DateKey, SequenceAllocator, postgres::PgCounterStore};
use server::{config::PostgresConfig, database::init_postgres};
use tracing::info;

pub mod utils;

pub async fn connect() -> Result<SequenceAllocator> {
    let config = PostgresConfig::load()?;
    let pool = init_postgres(&config).await?;

    Ok(SequenceAllocator::new(Arc::new(PgCounterStore::new(
        pool,
        config.lock_timeout_ms,
    ))))
}

pub async fn bootstrap(allocator: &SequenceAllocator) -> Result<()> {
    allocator.bootstrap().await?;
    println!("Counter table ready");

    Ok(())
}

pub async fn reset(allocator: &SequenceAllocator, date_key: &DateKey) -> Result<Option<u64>> {
    let previous = allocator.current(date_key).await?;
    allocator.reset_for_date(date_key).await?;

    match previous {
        Some(counter) => println!("Reset {date_key} (was {counter})"),
        None => println!("Nothing to reset for {date_key}"),
    }
    info!("Counter for {date_key} reset");

    Ok(previous)
}

pub async fn peek(allocator: &SequenceAllocator, date_key: &DateKey) -> Result<Option<u64>> {
    let current = allocator.current(date_key).await?;

    match current {
        Some(counter) => println!("{date_key}: {counter}"),
        None => println!("{date_key}: no registrations"),
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use registry::memory::MemoryCounterStore;

    use super::*;

    #[tokio::test]
    async fn test_reset_then_peek() {
        let allocator = SequenceAllocator::new(Arc::new(MemoryCounterStore::bootstrapped()));
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let key = DateKey::from(date);

        allocator.allocate_on(date).await.unwrap();
        allocator.allocate_on(date).await.unwrap();

        assert_eq!(peek(&allocator, &key).await.unwrap(), Some(2));
        assert_eq!(reset(&allocator, &key).await.unwrap(), Some(2));
        assert_eq!(peek(&allocator, &key).await.unwrap(), None);
        assert_eq!(reset(&allocator, &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bootstrap_is_repeatable() {
        let store = Arc::new(MemoryCounterStore::default());
        let allocator = SequenceAllocator::new(store.clone());

        bootstrap(&allocator).await.unwrap();
        bootstrap(&allocator).await.unwrap();

        assert!(store.is_bootstrapped().await);
    }
}
