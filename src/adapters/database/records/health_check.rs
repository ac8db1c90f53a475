use crate::domain::health::Sentinel;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct HealthCheckRecord {
    pub(crate) id: String,
    pub(crate) status: String,
}

impl From<HealthCheckRecord> for Sentinel {
    fn from(record: HealthCheckRecord) -> Self {
        Self { id: record.id, status: record.status }
    }
}
