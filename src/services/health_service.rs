use crate::config::ProbeMode;
use crate::domain::health::{Criticality, DependencyResult, HealthReport, ProbeOutcome};
use crate::services::probes::Probe;
use futures::future::join_all;
use opentelemetry::{
    KeyValue, global,
    metrics::{Gauge, Histogram},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::Instrument;

/// Upper bound the aggregator puts on any single probe, on top of the probe's
/// own timeout.
pub const DEFAULT_PROBE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
    pub check_duration_seconds: Histogram<f64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("tavern-server");
        Self {
            status: meter
                .i64_gauge("tavern_health_status")
                .with_description("Status of health checks (1 for up, 0 for down)")
                .build(),
            check_duration_seconds: meter
                .f64_histogram("tavern_health_check_duration_seconds")
                .with_description("Duration of individual dependency health checks")
                .with_unit("s")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A probe together with the name it reports under and whether its failure
/// fails the service.
#[derive(Clone, Debug)]
pub struct RegisteredProbe {
    pub name: String,
    pub criticality: Criticality,
    pub probe: Arc<dyn Probe>,
}

impl RegisteredProbe {
    pub fn new(name: impl Into<String>, criticality: Criticality, probe: Arc<dyn Probe>) -> Self {
        Self { name: name.into(), criticality, probe }
    }
}

/// Runs every registered probe and folds the results into a [`HealthReport`].
///
/// Holds no state between runs: each call to [`HealthService::report`] builds
/// a fresh snapshot.
#[derive(Clone, Debug)]
pub struct HealthService {
    probes: Arc<[RegisteredProbe]>,
    mode: ProbeMode,
    deadline: Duration,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(probes: Vec<RegisteredProbe>, mode: ProbeMode) -> Self {
        Self { probes: probes.into(), mode, deadline: DEFAULT_PROBE_DEADLINE, metrics: Metrics::new() }
    }

    /// Caps how long the aggregator waits for any one probe. A probe still
    /// running at the deadline is aborted and reported down.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name.as_str()).collect()
    }

    pub async fn report(&self) -> HealthReport {
        let start = Instant::now();

        let results = match self.mode {
            ProbeMode::Concurrent => {
                join_all(self.probes.iter().map(|registered| run_isolated(registered, self.deadline))).await
            }
            ProbeMode::Sequential => {
                let mut results = Vec::with_capacity(self.probes.len());
                for registered in self.probes.iter() {
                    results.push(run_isolated(registered, self.deadline).await);
                }
                results
            }
        };

        let api_elapsed = start.elapsed();

        for (name, criticality, result) in &results {
            self.record(name, result);
            if let Some(error) = &result.error {
                tracing::warn!(
                    component = %name,
                    critical = *criticality == Criticality::Critical,
                    response_time_ms = result.response_time_ms,
                    error = %error,
                    "Dependency health check failed"
                );
            }
        }

        let report = HealthReport::assemble(api_elapsed, results);
        tracing::debug!(healthy = report.status.is_healthy(), elapsed_ms = %api_elapsed.as_millis(), "Health report built");
        report
    }

    /// Best-effort report used when aggregation itself faulted: every
    /// registered dependency is marked down with `reason`.
    #[must_use]
    pub fn fallback_report(&self, reason: &str) -> HealthReport {
        let results = self
            .probes
            .iter()
            .map(|p| (p.name.clone(), p.criticality, DependencyResult::down(Duration::ZERO, reason)))
            .collect();
        HealthReport::assemble(Duration::ZERO, results)
    }

    fn record(&self, component: &str, result: &DependencyResult) {
        let attrs = [KeyValue::new("component", component.to_string())];
        self.metrics.status.record(i64::from(result.is_up()), &attrs);
        #[allow(clippy::cast_precision_loss)]
        self.metrics.check_duration_seconds.record(result.response_time_ms as f64 / 1000.0, &attrs);
    }
}

/// Runs one probe on its own task so a panic cannot take the report down with it.
/// The elapsed time covers only the probe's `check` call.
async fn run_isolated(registered: &RegisteredProbe, deadline: Duration) -> (String, Criticality, DependencyResult) {
    let probe = Arc::clone(&registered.probe);
    let spawned_at = Instant::now();

    let mut handle = tokio::spawn(
        async move {
            let start = Instant::now();
            let outcome = probe.check().await;
            (outcome, start.elapsed())
        }
        .instrument(tracing::debug_span!("health_probe", component = %registered.name)),
    );

    let result = match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok((outcome, elapsed))) => DependencyResult::from_outcome(outcome, elapsed),
        Ok(Err(e)) => DependencyResult::from_outcome(join_failure(e), spawned_at.elapsed()),
        Err(_) => {
            handle.abort();
            let reason = format!("{} probe exceeded the {}ms deadline", registered.name, deadline.as_millis());
            DependencyResult::down(spawned_at.elapsed(), reason)
        }
    };

    (registered.name.clone(), registered.criticality, result)
}

fn join_failure(e: JoinError) -> ProbeOutcome {
    if !e.is_panic() {
        return ProbeOutcome::unreachable(format!("probe task failed: {e}"));
    }

    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ProbeOutcome::Unreachable(format!("probe panicked: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::health::{API_SERVICE, DependencyStatus, HealthStatus};
    use async_trait::async_trait;

    #[derive(Debug)]
    enum FakeProbe {
        Up,
        Down(&'static str),
        Slow(Duration),
        Stuck,
        Panics,
    }

    #[async_trait]
    impl Probe for FakeProbe {
        async fn check(&self) -> ProbeOutcome {
            match self {
                Self::Up => ProbeOutcome::Up,
                Self::Down(reason) => ProbeOutcome::Unreachable((*reason).to_string()),
                Self::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    ProbeOutcome::Up
                }
                Self::Stuck => std::future::pending().await,
                #[allow(clippy::panic)]
                Self::Panics => panic!("sentinel lookup exploded"),
            }
        }
    }

    fn registered(name: &str, criticality: Criticality, probe: FakeProbe) -> RegisteredProbe {
        RegisteredProbe::new(name, criticality, Arc::new(probe))
    }

    #[tokio::test]
    async fn test_all_up_is_healthy() {
        let service = HealthService::new(
            vec![registered("database", Criticality::Critical, FakeProbe::Up)],
            ProbeMode::Concurrent,
        );

        let report = service.report().await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.services.keys().collect::<Vec<_>>(), vec!["api", "database"]);
        assert!(report.services["database"].error.is_none());
    }

    #[tokio::test]
    async fn test_critical_down_is_unhealthy() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("storage", Criticality::Critical, FakeProbe::Down("bucket missing")),
            ],
            ProbeMode::Concurrent,
        );

        let report = service.report().await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.services["database"].status, DependencyStatus::Up);
        assert_eq!(report.services["storage"].error.as_deref(), Some("bucket missing"));
        assert_eq!(report.services[API_SERVICE].status, DependencyStatus::Up);
    }

    #[tokio::test]
    async fn test_optional_down_stays_healthy() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("storage", Criticality::Optional, FakeProbe::Down("bucket missing")),
            ],
            ProbeMode::Concurrent,
        );

        let report = service.report().await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.services["storage"].status, DependencyStatus::Down);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Panics),
                registered("cache", Criticality::Optional, FakeProbe::Up),
            ],
            ProbeMode::Concurrent,
        );

        let report = service.report().await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(
            report.services["database"].error.as_deref(),
            Some("probe panicked: sentinel lookup exploded")
        );
        assert_eq!(report.services["cache"].status, DependencyStatus::Up);
    }

    #[tokio::test]
    async fn test_concurrent_probes_time_independently() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Slow(Duration::from_millis(150))),
                registered("storage", Criticality::Critical, FakeProbe::Slow(Duration::from_millis(150))),
                registered("cache", Criticality::Optional, FakeProbe::Up),
            ],
            ProbeMode::Concurrent,
        );

        let report = service.report().await;

        let api_ms = report.services["api"].response_time_ms;
        assert!(report.services["database"].response_time_ms >= 150);
        assert!(report.services["storage"].response_time_ms >= 150);
        assert!(report.services["cache"].response_time_ms < 150);
        // Fan-out means the total is bounded by the slowest probe, not the sum.
        assert!(api_ms >= 150);
        assert!(api_ms < 300, "expected concurrent execution, took {api_ms}ms");
    }

    #[tokio::test]
    async fn test_sequential_mode_gives_same_verdict() {
        let probes = || {
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("storage", Criticality::Critical, FakeProbe::Down("bucket missing")),
            ]
        };

        let concurrent = HealthService::new(probes(), ProbeMode::Concurrent).report().await;
        let sequential = HealthService::new(probes(), ProbeMode::Sequential).report().await;

        assert_eq!(concurrent.status, sequential.status);
        for (name, result) in &concurrent.services {
            assert_eq!(result.status, sequential.services[name].status);
            assert_eq!(result.error, sequential.services[name].error);
        }
    }

    #[tokio::test]
    async fn test_repeated_reports_have_same_shape() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("storage", Criticality::Optional, FakeProbe::Down("bucket missing")),
            ],
            ProbeMode::Concurrent,
        );

        let first = service.report().await;
        let second = service.report().await;

        assert_eq!(first.status, second.status);
        assert_eq!(first.services.keys().collect::<Vec<_>>(), second.services.keys().collect::<Vec<_>>());
        assert!(second.timestamp >= first.timestamp);
    }

    #[tokio::test]
    async fn test_stuck_probe_is_cut_off_at_deadline() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("dice-roller", Criticality::Optional, FakeProbe::Stuck),
            ],
            ProbeMode::Sequential,
        )
        .with_deadline(Duration::from_millis(50));

        let report = tokio::time::timeout(Duration::from_secs(2), service.report())
            .await
            .expect("report must not wait on a stuck probe");

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.services["database"].status, DependencyStatus::Up);
        assert_eq!(
            report.services["dice-roller"].error.as_deref(),
            Some("dice-roller probe exceeded the 50ms deadline")
        );
        assert!(report.services["dice-roller"].response_time_ms >= 50);
    }

    #[test]
    fn test_fallback_marks_every_dependency_down() {
        let service = HealthService::new(
            vec![
                registered("database", Criticality::Critical, FakeProbe::Up),
                registered("cache", Criticality::Optional, FakeProbe::Up),
            ],
            ProbeMode::Concurrent,
        );

        let report = service.fallback_report("health aggregation failed");

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.services["database"].error.as_deref(), Some("health aggregation failed"));
        assert_eq!(report.services["cache"].status, DependencyStatus::Down);
        assert_eq!(report.services["api"].status, DependencyStatus::Up);
    }
}
