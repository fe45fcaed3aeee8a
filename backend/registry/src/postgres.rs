//! # Postgres
//!
//! Durable home of the counter rows.
//!
//! ## Schema
//! - `nupcan_counters(date_key VARCHAR(5) PRIMARY KEY, counter BIGINT NOT NULL CHECK (counter >= 1))`
//! - Created lazily by the allocator on first use, or up front with `process bootstrap`
//! - Concurrent bootstraps queue on an advisory lock, `CREATE TABLE IF NOT EXISTS` alone
//!   still races on the catalog when two sessions create the same table
//!
//! ## Locking
//! - `SELECT ... FOR UPDATE` holds the row until commit or rollback
//! - `SET LOCAL lock_timeout` bounds the wait; expiry maps to an allocation conflict
//! - First allocation of a day has no row to lock, so the insert goes through
//!   `ON CONFLICT DO UPDATE` and the primary key serializes racing inserts instead
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::{RegistryError, counter::CounterStore, nupcan::DateKey};

pub const COUNTER_TABLE: &str = "nupcan_counters";

const UNDEFINED_TABLE: &str = "42P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";
const DUPLICATE_TABLE: &str = "42P07";

/// Advisory lock key taken around the DDL ("NUPCAN" in ASCII).
const BOOTSTRAP_LOCK_KEY: i64 = 0x4E55_5043_414E;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS nupcan_counters (
        date_key VARCHAR(5) PRIMARY KEY,
        counter BIGINT NOT NULL CHECK (counter >= 1)
    )
"#;

const SELECT_FOR_UPDATE: &str = "SELECT counter FROM nupcan_counters WHERE date_key = $1 FOR UPDATE";

const UPDATE_COUNTER: &str = "UPDATE nupcan_counters SET counter = $2 WHERE date_key = $1";

const INSERT_COUNTER: &str = r#"
    INSERT INTO nupcan_counters (date_key, counter) VALUES ($1, 1)
    ON CONFLICT (date_key) DO UPDATE SET counter = nupcan_counters.counter + 1
    RETURNING counter
"#;

pub struct PgCounterStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgCounterStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    async fn create_table(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // released on commit or rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;

        tx.commit().await
    }

    async fn increment_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        date_key: &DateKey,
    ) -> Result<i64, sqlx::Error> {
        // SET LOCAL does not accept bind parameters
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut **tx)
            .await?;

        let existing: Option<i64> = sqlx::query_scalar(SELECT_FOR_UPDATE)
            .bind(date_key.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        match existing {
            Some(counter) => {
                let next = counter + 1;
                sqlx::query(UPDATE_COUNTER)
                    .bind(date_key.as_str())
                    .bind(next)
                    .execute(&mut **tx)
                    .await?;

                Ok(next)
            }
            None => {
                sqlx::query_scalar(INSERT_COUNTER)
                    .bind(date_key.as_str())
                    .fetch_one(&mut **tx)
                    .await
            }
        }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(&self, date_key: &DateKey) -> Result<u64, RegistryError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // dropping `tx` on error rolls back
        let next = self
            .increment_in(&mut tx, date_key)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        debug!("Counter {date_key} now {next}");

        u64::try_from(next).map_err(|_| {
            RegistryError::AllocationConflict(format!("counter for {date_key} is negative"))
        })
    }

    async fn bootstrap(&self) -> Result<(), RegistryError> {
        match self.create_table().await {
            Ok(()) => {}
            Err(e) if already_created(&e) => {
                debug!("Counter table created by a concurrent bootstrap");
            }
            Err(e) => {
                return Err(RegistryError::AllocationConflict(format!(
                    "bootstrap failed: {e}"
                )));
            }
        }

        info!("Counter table {COUNTER_TABLE} ready");

        Ok(())
    }

    async fn reset(&self, date_key: &DateKey) -> Result<(), RegistryError> {
        sqlx::query("DELETE FROM nupcan_counters WHERE date_key = $1")
            .bind(date_key.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn peek(&self, date_key: &DateKey) -> Result<Option<u64>, RegistryError> {
        let counter: Option<i64> =
            sqlx::query_scalar("SELECT counter FROM nupcan_counters WHERE date_key = $1")
                .bind(date_key.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;

        Ok(counter.and_then(|c| u64::try_from(c).ok()))
    }
}

fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Catalog collisions from a DDL that lost the race to another session.
fn already_created(error: &sqlx::Error) -> bool {
    matches!(
        sqlstate(error).as_deref(),
        Some(UNIQUE_VIOLATION) | Some(DUPLICATE_TABLE)
    )
}

fn classify(error: sqlx::Error) -> RegistryError {
    if let sqlx::Error::Database(db_error) = &error {
        match db_error.code().as_deref() {
            Some(UNDEFINED_TABLE) => return RegistryError::StorageBootstrap,
            Some(LOCK_NOT_AVAILABLE) => {
                return RegistryError::AllocationConflict(format!(
                    "counter row lock not acquired: {db_error}"
                ));
            }
            _ => {}
        }
    }

    RegistryError::AllocationConflict(error.to_string())
}
