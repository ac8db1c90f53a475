use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Name under which the process reports its own liveness.
pub const API_SERVICE: &str = "api";

pub const DATABASE_SERVICE: &str = "database";
pub const STORAGE_SERVICE: &str = "storage";
pub const CACHE_SERVICE: &str = "cache";

const UNKNOWN_ERROR: &str = "unknown error";

/// Status value the seeded sentinel row must carry.
pub const SENTINEL_OK: &str = "ok";

/// The pre-seeded row whose presence confirms the persistence layer answers correctly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentinel {
    pub id: String,
    pub status: String,
}

impl Sentinel {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == SENTINEL_OK
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyStatus {
    Up,
    Down,
}

impl DependencyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Whether a dependency's failure should fail the whole service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criticality {
    Critical,
    Optional,
}

/// What a single probe observed.
///
/// `Degraded` means the dependency answered but is in a bad state; `Unreachable`
/// means the check itself faulted (connection error, timeout, protocol error).
/// Both surface as `down`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Up,
    Degraded(String),
    Unreachable(String),
}

impl ProbeOutcome {
    /// Builds an `Unreachable` outcome from a fault, substituting a generic
    /// message when the fault has nothing to say.
    pub fn unreachable(fault: impl fmt::Display) -> Self {
        let message = fault.to_string();
        if message.trim().is_empty() { Self::Unreachable(UNKNOWN_ERROR.to_string()) } else { Self::Unreachable(message) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyResult {
    pub status: DependencyStatus,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

impl DependencyResult {
    #[must_use]
    pub fn up(elapsed: Duration) -> Self {
        Self { status: DependencyStatus::Up, response_time_ms: millis(elapsed), error: None }
    }

    #[must_use]
    pub fn down(elapsed: Duration, error: impl Into<String>) -> Self {
        Self { status: DependencyStatus::Down, response_time_ms: millis(elapsed), error: Some(error.into()) }
    }

    #[must_use]
    pub fn from_outcome(outcome: ProbeOutcome, elapsed: Duration) -> Self {
        match outcome {
            ProbeOutcome::Up => Self::up(elapsed),
            ProbeOutcome::Degraded(reason) | ProbeOutcome::Unreachable(reason) => Self::down(elapsed, reason),
        }
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == DependencyStatus::Up
    }
}

/// A finished, immutable snapshot of service health.
#[derive(Clone, Debug)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: OffsetDateTime,
    pub services: BTreeMap<String, DependencyResult>,
}

impl HealthReport {
    /// Folds per-dependency results into a report. Only critical dependencies
    /// influence the overall status; the `api` entry is always up.
    #[must_use]
    pub fn assemble(api_elapsed: Duration, results: Vec<(String, Criticality, DependencyResult)>) -> Self {
        let mut status = HealthStatus::Healthy;
        let mut services = BTreeMap::new();
        services.insert(API_SERVICE.to_string(), DependencyResult::up(api_elapsed));

        for (name, criticality, result) in results {
            if criticality == Criticality::Critical && !result.is_up() {
                status = HealthStatus::Unhealthy;
            }
            services.insert(name, result);
        }

        Self { status, timestamp: OffsetDateTime::now_utc(), services }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
