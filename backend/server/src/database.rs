//! # Connections
//!
//! ## Postgres
//! Holds the `nupcan_counters` table. Every allocation is one short transaction, so the
//! pool only needs to cover concurrent registrations, not long lived sessions.
//!
//! ## Redis
//! RAM database for progression records. One connection manager shared by all requests,
//! it reconnects on its own.
use std::time::Duration;

use anyhow::{Context, Result};
use redis::{
    Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

use super::config::PostgresConfig;

pub async fn init_postgres(config: &PostgresConfig) -> Result<PgPool> {
    let url = format!(
        "postgres://{}:{}@{}:{}/{}",
        config.user, config.password, config.host, config.port, config.database
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await
        .with_context(|| format!("Failed to connect to postgres at {}", config.host))
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).context("Invalid redis url")?;

    client
        .get_connection_manager_with_config(config)
        .await
        .context("Failed to connect to redis")
}
