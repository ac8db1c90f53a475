use crate::adapters::database::SentinelSource;
use crate::domain::health::{DATABASE_SERVICE, ProbeOutcome};
use crate::services::probes::{Probe, bounded};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const SENTINEL_INVALID: &str = "health check row not found or status not ok";

/// Persistence liveness: the seeded sentinel row must exist and read `ok`.
#[derive(Clone, Debug)]
pub struct DatabaseProbe {
    source: Arc<dyn SentinelSource>,
    sentinel_id: String,
    timeout: Duration,
}

impl DatabaseProbe {
    #[must_use]
    pub fn new(source: Arc<dyn SentinelSource>, sentinel_id: String, timeout: Duration) -> Self {
        Self { source, sentinel_id, timeout }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    async fn check(&self) -> ProbeOutcome {
        match bounded(DATABASE_SERVICE, self.timeout, self.source.find_sentinel(&self.sentinel_id)).await {
            Ok(Some(sentinel)) if sentinel.is_ok() => ProbeOutcome::Up,
            Ok(_) => ProbeOutcome::Degraded(SENTINEL_INVALID.to_string()),
            Err(outcome) => outcome,
        }
    }
}
