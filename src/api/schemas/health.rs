use crate::domain::health::{self, DependencyResult, HealthReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: OverallStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl From<health::HealthStatus> for OverallStatus {
    fn from(status: health::HealthStatus) -> Self {
        match status {
            health::HealthStatus::Healthy => Self::Healthy,
            health::HealthStatus::Unhealthy => Self::Unhealthy,
        }
    }
}

impl From<health::DependencyStatus> for ServiceStatus {
    fn from(status: health::DependencyStatus) -> Self {
        match status {
            health::DependencyStatus::Up => Self::Up,
            health::DependencyStatus::Down => Self::Down,
        }
    }
}

impl From<DependencyResult> for ServiceHealth {
    fn from(result: DependencyResult) -> Self {
        Self { status: result.status.into(), response_time: result.response_time_ms, error: result.error }
    }
}

impl From<HealthReport> for HealthResponse {
    fn from(report: HealthReport) -> Self {
        Self {
            status: report.status.into(),
            timestamp: report.timestamp,
            services: report.services.into_iter().map(|(name, result)| (name, result.into())).collect(),
        }
    }
}
