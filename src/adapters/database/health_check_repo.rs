use crate::adapters::database::records::HealthCheckRecord;
use crate::adapters::database::{DbPool, SentinelSource};
use crate::domain::health::Sentinel;
use crate::error::Result;
use async_trait::async_trait;

#[derive(Clone, Debug)]
pub struct HealthCheckRepository {
    pool: DbPool,
}

impl HealthCheckRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SentinelSource for HealthCheckRepository {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn find_sentinel(&self, id: &str) -> Result<Option<Sentinel>> {
        let record = sqlx::query_as::<_, HealthCheckRecord>("SELECT id, status FROM health_check WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Into::into))
    }
}
