#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::database::{DbPool, HealthCheckRepository, SentinelSource};
use crate::adapters::redis::Cache;
use crate::adapters::storage::{ObjectStorage, S3Storage};
use crate::api::{AppState, MgmtState};
use crate::config::Config;
use crate::domain::health::{API_SERVICE, CACHE_SERVICE, Criticality, DATABASE_SERVICE, STORAGE_SERVICE};
use crate::services::health_service::{HealthService, RegisteredProbe};
use crate::services::probes::{CacheProbe, DatabaseProbe, StorageProbe};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The wired application: everything the routers need, built once at boot.
#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub health_service: HealthService,
}

impl App {
    #[must_use]
    pub fn app_router(&self) -> axum::Router {
        api::app_router(AppState {
            health_service: self.health_service.clone(),
            unhealthy_response: self.config.health.unhealthy_response,
        })
    }

    #[must_use]
    pub fn mgmt_router(&self) -> axum::Router {
        api::mgmt_router(MgmtState { health_service: self.health_service.clone() })
    }
}

/// Wires dependencies into probes and probes into the [`HealthService`].
///
/// Every dependency is handed in explicitly, so tests can substitute fakes for
/// the database, storage and cache.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    sentinel: Option<Arc<dyn SentinelSource>>,
    storage: Option<Arc<dyn ObjectStorage>>,
    cache: Option<Arc<dyn Cache>>,
    extra_probes: Vec<RegisteredProbe>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, sentinel: None, storage: None, cache: None, extra_probes: Vec::new() }
    }

    #[must_use]
    pub fn with_database(self, pool: DbPool) -> Self {
        self.with_sentinel_source(Arc::new(HealthCheckRepository::new(pool)))
    }

    #[must_use]
    pub fn with_sentinel_source(mut self, source: Arc<dyn SentinelSource>) -> Self {
        self.sentinel = Some(source);
        self
    }

    /// Registers the S3 client for the storage probe. Ignored when no bucket is configured.
    #[must_use]
    pub fn with_s3(self, client: aws_sdk_s3::Client) -> Self {
        match self.config.storage.bucket.clone() {
            Some(bucket) => self.with_object_storage(Arc::new(S3Storage::new(client, bucket))),
            None => self,
        }
    }

    #[must_use]
    pub fn with_object_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers an additional probe beyond the built-in dependencies.
    #[must_use]
    pub fn with_probe(mut self, probe: RegisteredProbe) -> Self {
        self.extra_probes.push(probe);
        self
    }

    /// Builds the application.
    ///
    /// # Errors
    /// Returns an error if no database sentinel source was provided, or if a
    /// probe name is reused or claims the reserved `api` entry.
    pub fn build(self) -> anyhow::Result<App> {
        let health = &self.config.health;
        let sentinel = self.sentinel.ok_or_else(|| anyhow::anyhow!("database sentinel source is required"))?;

        let mut probes = vec![RegisteredProbe::new(
            DATABASE_SERVICE,
            Criticality::Critical,
            Arc::new(DatabaseProbe::new(
                sentinel,
                health.sentinel_id.clone(),
                Duration::from_millis(health.db_timeout_ms),
            )),
        )];

        if let Some(storage) = self.storage {
            probes.push(RegisteredProbe::new(
                STORAGE_SERVICE,
                criticality(health.storage_critical),
                Arc::new(StorageProbe::new(storage, Duration::from_millis(health.storage_timeout_ms))),
            ));
        }

        if let Some(cache) = self.cache {
            probes.push(RegisteredProbe::new(
                CACHE_SERVICE,
                criticality(health.cache_critical),
                Arc::new(CacheProbe::new(cache, Duration::from_millis(health.cache_timeout_ms))),
            ));
        }

        probes.extend(self.extra_probes);
        ensure_unique_names(&probes)?;

        let health_service = HealthService::new(probes, health.probe_mode)
            .with_deadline(Duration::from_millis(health.probe_deadline_ms));
        tracing::info!(probes = ?health_service.probe_names(), mode = ?health.probe_mode, "health probes registered");

        Ok(App { config: self.config, health_service })
    }
}

/// Each probe owns exactly one entry in the report, and `api` belongs to the
/// aggregator itself.
fn ensure_unique_names(probes: &[RegisteredProbe]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for registered in probes {
        anyhow::ensure!(registered.name != API_SERVICE, "probe name {API_SERVICE:?} is reserved");
        anyhow::ensure!(seen.insert(registered.name.as_str()), "probe {:?} is registered twice", registered.name);
    }
    Ok(())
}

const fn criticality(critical: bool) -> Criticality {
    if critical { Criticality::Critical } else { Criticality::Optional }
}

/// Routes panics through `tracing` so they reach structured logs.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::error!(panic.location = %location, panic.message = %payload, "panic occurred");
    }));
}

/// Flips `shutdown_tx` to `true` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::health::{HealthStatus, ProbeOutcome, Sentinel};
    use crate::services::probes::Probe;
    use crate::error::Result;
    use async_trait::async_trait;
    use clap::Parser;

    #[derive(Debug)]
    struct SeededSentinel;

    #[async_trait]
    impl SentinelSource for SeededSentinel {
        async fn find_sentinel(&self, id: &str) -> Result<Option<Sentinel>> {
            Ok(Some(Sentinel { id: id.to_string(), status: "ok".to_string() }))
        }
    }

    #[derive(Debug)]
    struct DeadCache;

    #[async_trait]
    impl Cache for DeadCache {
        async fn ping(&self) -> Result<String> {
            Err(crate::error::AppError::Internal)
        }
    }

    #[derive(Debug)]
    struct FixedProbe(bool);

    #[async_trait]
    impl Probe for FixedProbe {
        async fn check(&self) -> ProbeOutcome {
            if self.0 { ProbeOutcome::Up } else { ProbeOutcome::Unreachable("down".to_string()) }
        }
    }

    fn fixed(name: &str, criticality: Criticality, up: bool) -> RegisteredProbe {
        RegisteredProbe::new(name, criticality, Arc::new(FixedProbe(up)))
    }

    fn config(extra: &[&str]) -> Config {
        let mut args = vec!["tavern-server", "--database-url", "postgres://localhost/tavern"];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).expect("test config parses")
    }

    #[test]
    fn test_build_requires_sentinel_source() {
        assert!(AppBuilder::new(config(&[])).build().is_err());
    }

    #[tokio::test]
    async fn test_cache_is_optional_by_default() {
        let app = AppBuilder::new(config(&[]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_cache(Arc::new(DeadCache))
            .build()
            .expect("app builds");

        assert_eq!(app.health_service.probe_names(), vec!["database", "cache"]);

        let report = app.health_service.report().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(!report.services["cache"].is_up());
    }

    #[tokio::test]
    async fn test_cache_can_be_made_critical() {
        let app = AppBuilder::new(config(&["--health-cache-critical", "true"]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_cache(Arc::new(DeadCache))
            .build()
            .expect("app builds");

        assert_eq!(app.health_service.report().await.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_build_rejects_probe_shadowing_builtin() {
        let err = AppBuilder::new(config(&[]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_probe(fixed("database", Criticality::Optional, true))
            .build()
            .expect_err("duplicate name must be rejected");

        assert!(err.to_string().contains("\"database\" is registered twice"), "{err}");
    }

    #[test]
    fn test_build_rejects_duplicate_extra_probes() {
        let result = AppBuilder::new(config(&[]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_probe(fixed("dice-roller", Criticality::Critical, false))
            .with_probe(fixed("dice-roller", Criticality::Optional, true))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_reserved_api_name() {
        let err = AppBuilder::new(config(&[]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_probe(fixed("api", Criticality::Optional, false))
            .build()
            .expect_err("api is reserved");

        assert!(err.to_string().contains("reserved"), "{err}");
    }

    #[tokio::test]
    async fn test_extra_probe_gets_its_own_entry() {
        let app = AppBuilder::new(config(&[]))
            .with_sentinel_source(Arc::new(SeededSentinel))
            .with_probe(fixed("dice-roller", Criticality::Critical, false))
            .build()
            .expect("app builds");

        let report = app.health_service.report().await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.services["api"].is_up());
        assert!(report.services["database"].is_up());
        assert!(!report.services["dice-roller"].is_up());
    }
}
