//! Liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<HealthCheck>,
}

impl HealthResponse {
    /// Overall status is the worst of the individual checks
    fn from_checks(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            version: VERSION,
            checks,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.status == HealthStatus::Unhealthy {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        }
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::from_checks(Vec::new()))
}

/// GET /ready
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse::from_checks(vec![store_check(&state).await, cache_check(&state)]);
    (response.status_code(), Json(response))
}

async fn store_check(state: &AppState) -> HealthCheck {
    let started = Instant::now();
    let (status, message) = match state.store.preview().await {
        Ok(preview) => (HealthStatus::Healthy, format!("{} rows", preview.total_rows)),
        Err(e) => (HealthStatus::Unhealthy, e.to_string()),
    };

    HealthCheck {
        name: "contact_store",
        status,
        message,
        latency_ms: Some(started.elapsed().as_millis() as u64),
    }
}

/// A disabled cache still answers, just slower
fn cache_check(state: &AppState) -> HealthCheck {
    let stats = state.assistant.cache_stats();
    HealthCheck {
        name: "semantic_cache",
        status: if state.assistant.is_cache_enabled() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        message: format!("{}/{} entries", stats.size, stats.max_size),
        latency_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck {
            name: "probe",
            status,
            message: String::new(),
            latency_ms: None,
        }
    }

    #[test]
    fn test_worst_check_wins() {
        let response =
            HealthResponse::from_checks(vec![check(HealthStatus::Healthy), check(HealthStatus::Degraded)]);
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.status_code(), StatusCode::OK);

        let response =
            HealthResponse::from_checks(vec![check(HealthStatus::Unhealthy), check(HealthStatus::Degraded)]);
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_liveness_body_has_no_checks() {
        let json = serde_json::to_string(&HealthResponse::from_checks(Vec::new())).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("checks"));
    }
}
