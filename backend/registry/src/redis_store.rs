//! # Redis
//!
//! RAM database holding progression records.
//!
//! ## Requirements
//! - O(1) lookups by NUPCAN
//! - Small values, one JSON blob per candidate
//! - Records age out on their own like the client's local storage would
//!
//! ## Implementation
//! - Plain string keys `progress_<nupcan>`, JSON value
//! - `SET EX` with the configured TTL, plain `SET` when the TTL is zero
//! - Estimated memory usage:
//!   (~250 bytes (record) + ~60 bytes (key overhead)) × 50,000 candidates = roughly 15 MB
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{RegistryError, progress::ProgressStore};

#[derive(Clone)]
pub struct RedisProgressStore {
    connection: ConnectionManager,
    ttl_secs: u64,
}

impl RedisProgressStore {
    pub fn new(connection: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            connection,
            ttl_secs,
        }
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn load(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let mut connection = self.connection.clone();

        connection
            .get(key)
            .await
            .map_err(|e| RegistryError::ProgressStorage(e.to_string()))
    }

    async fn save(&self, key: &str, value: String) -> Result<(), RegistryError> {
        let mut connection = self.connection.clone();

        let result: Result<(), _> = if self.ttl_secs == 0 {
            connection.set(key, value).await
        } else {
            connection.set_ex(key, value, self.ttl_secs).await
        };

        result.map_err(|e| RegistryError::ProgressStorage(e.to_string()))
    }
}
