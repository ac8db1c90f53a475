use crate::adapters::redis::Cache;
use crate::domain::health::{CACHE_SERVICE, ProbeOutcome};
use crate::services::probes::{Probe, bounded};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct CacheProbe {
    cache: Arc<dyn Cache>,
    timeout: Duration,
}

impl CacheProbe {
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, timeout: Duration) -> Self {
        Self { cache, timeout }
    }
}

#[async_trait]
impl Probe for CacheProbe {
    async fn check(&self) -> ProbeOutcome {
        match bounded(CACHE_SERVICE, self.timeout, self.cache.ping()).await {
            Ok(reply) if reply.eq_ignore_ascii_case("PONG") => ProbeOutcome::Up,
            Ok(reply) => ProbeOutcome::Degraded(format!("unexpected PING reply: {reply}")),
            Err(outcome) => outcome,
        }
    }
}
