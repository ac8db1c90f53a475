use crate::api::schemas::health::HealthResponse;
use crate::api::{AppState, MgmtState};
use crate::config::UnhealthyResponsePolicy;
use crate::domain::health::HealthReport;
use crate::error::{AppError, Result};
use crate::services::health_service::HealthService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Dependency health report for uptime checkers and dashboards.
///
/// The status code follows the configured [`UnhealthyResponsePolicy`]; by
/// default it is 200 and callers must inspect the `status` field.
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let report = collect(&state.health_service).await;
    let status_code = match (state.unhealthy_response, report.status.is_healthy()) {
        (UnhealthyResponsePolicy::ServiceUnavailable, false) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    Ok((status_code, Json(serialize(report)?)))
}

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: 503 whenever a critical dependency is down.
pub async fn readyz(State(state): State<MgmtState>) -> Result<impl IntoResponse> {
    let report = collect(&state.health_service).await;
    let status_code = if report.status.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    if status_code != StatusCode::OK {
        tracing::warn!("Readiness probe failed");
    }

    Ok((status_code, Json(serialize(report)?)))
}

async fn collect(service: &HealthService) -> HealthReport {
    guarded(service, service.report()).await
}

/// Serves the fallback report if `aggregation` panics, so the endpoint always
/// answers with a well-formed body.
async fn guarded<F>(service: &HealthService, aggregation: F) -> HealthReport
where
    F: Future<Output = HealthReport>,
{
    match AssertUnwindSafe(aggregation).catch_unwind().await {
        Ok(report) => report,
        Err(_) => {
            tracing::error!("Health aggregation panicked, serving fallback report");
            service.fallback_report("health aggregation failed")
        }
    }
}

fn serialize(report: HealthReport) -> Result<serde_json::Value> {
    serde_json::to_value(HealthResponse::from(report)).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize health report");
        AppError::Internal
    })
}
