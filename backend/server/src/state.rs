use std::sync::Arc;

use anyhow::Result;
use registry::{
    CounterStore, ProgressStore, ProgressTracker, SequenceAllocator, memory::MemoryProgressStore,
    postgres::PgCounterStore, redis_store::RedisProgressStore,
};
use tracing::{info, warn};

use super::{
    config::{Config, ProgressBackend},
    database::{init_postgres, init_redis},
    notifier::{LogNotifier, Notifier, WebhookNotifier},
};

pub struct State {
    pub allocator: SequenceAllocator,
    pub tracker: ProgressTracker,
    pub notifier: Arc<dyn Notifier>,
}

impl State {
    pub async fn new(config: &Config) -> Result<Arc<Self>> {
        let pool = init_postgres(&config.postgres).await?;
        let counter_store = Arc::new(PgCounterStore::new(pool, config.postgres.lock_timeout_ms));

        let progress_store: Arc<dyn ProgressStore> = match config.progress_backend {
            ProgressBackend::Redis => {
                let connection = init_redis(&config.redis_url).await?;
                Arc::new(RedisProgressStore::new(connection, config.progress_ttl_secs))
            }
            ProgressBackend::Memory => {
                warn!("Progress kept in memory, it will not survive a restart");
                Arc::new(MemoryProgressStore::default())
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.mail_relay_url {
            Some(url) => {
                info!("Sending confirmations through {url}");
                Arc::new(WebhookNotifier::new(url.clone())?)
            }
            None => Arc::new(LogNotifier),
        };

        Ok(Self::from_parts(counter_store, progress_store, notifier))
    }

    pub fn from_parts(
        counter_store: Arc<dyn CounterStore>,
        progress_store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            allocator: SequenceAllocator::new(counter_store),
            tracker: ProgressTracker::new(progress_store),
            notifier,
        })
    }
}
