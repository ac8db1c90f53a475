//! Bounded checks against individual downstream dependencies.
//!
//! Every probe returns a [`ProbeOutcome`] rather than a `Result`: faults are
//! converted into data at the probe, so nothing a dependency does can escape
//! into the aggregation. Timing is taken by the caller around [`Probe::check`].

use crate::domain::health::ProbeOutcome;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub mod cache;
pub mod database;
pub mod storage;

pub use cache::CacheProbe;
pub use database::DatabaseProbe;
pub use storage::StorageProbe;

#[async_trait]
pub trait Probe: Send + Sync + std::fmt::Debug + 'static {
    async fn check(&self) -> ProbeOutcome;
}

/// Runs `fut` under `limit`, folding adapter errors and timeouts into an
/// `Unreachable` outcome.
pub(crate) async fn bounded<T, F>(component: &str, limit: Duration, fut: F) -> Result<T, ProbeOutcome>
where
    F: Future<Output = crate::error::Result<T>> + Send,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ProbeOutcome::unreachable(e)),
        Err(_) => Err(ProbeOutcome::Unreachable(format!("{component} probe timed out after {}ms", limit.as_millis()))),
    }
}
