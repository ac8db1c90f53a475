use crate::adapters::storage::ObjectStorage;
use crate::domain::health::{ProbeOutcome, STORAGE_SERVICE};
use crate::services::probes::{Probe, bounded};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct StorageProbe {
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl StorageProbe {
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>, timeout: Duration) -> Self {
        Self { storage, timeout }
    }
}

#[async_trait]
impl Probe for StorageProbe {
    async fn check(&self) -> ProbeOutcome {
        match bounded(STORAGE_SERVICE, self.timeout, self.storage.head_bucket()).await {
            Ok(()) => ProbeOutcome::Up,
            Err(outcome) => outcome,
        }
    }
}
