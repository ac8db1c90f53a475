pub mod health_check_repo;
pub mod records;

pub use health_check_repo::HealthCheckRepository;

use crate::config::DatabaseConfig;
use crate::domain::health::Sentinel;
use crate::error::Result;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

/// Read access to the seeded sentinel row used for persistence liveness.
#[async_trait]
pub trait SentinelSource: Send + Sync + std::fmt::Debug {
    /// Looks up the sentinel row by its identifier.
    ///
    /// # Errors
    /// Returns an error if the lookup could not be performed.
    async fn find_sentinel(&self, id: &str) -> Result<Option<Sentinel>>;
}

/// Initializes the database connection pool, retrying with exponential backoff
/// until `connect_attempts` is exhausted.
///
/// # Errors
/// Returns `sqlx::Error` if every connection attempt fails.
pub async fn init_pool(config: &DatabaseConfig) -> std::result::Result<DbPool, sqlx::Error> {
    let retry_strategy = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(250))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(config.connect_attempts.saturating_sub(1));

    (|| async {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
    })
    .retry(retry_strategy)
    .notify(|e, delay| {
        tracing::warn!(error = %e, retry_in = ?delay, "Database connection failed, retrying");
    })
    .await
}
