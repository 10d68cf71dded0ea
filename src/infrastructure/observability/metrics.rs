//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the Prometheus recorder. Returns `None` when disabled or when a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("agenda_assistant_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("semantic_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_eviction() {
    counter!("semantic_cache_evictions_total").increment(1);
}

pub fn record_llm_call(model: &str, success: bool, duration: Duration) {
    let labels = [
        ("model", model.to_string()),
        ("outcome", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("llm_calls_total", &labels).increment(1);
    histogram!("llm_call_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_fallback(from_model: &str, to_model: &str) {
    counter!(
        "llm_fallback_activations_total",
        "from" => from_model.to_string(),
        "to" => to_model.to_string()
    )
    .increment(1);
}

/// Parameters for pipeline run metrics
pub struct PipelineRunMetricParams<'a> {
    pub outcome: &'a str,
    pub attempts: u32,
    pub duration: Duration,
}

pub fn record_pipeline_run(params: PipelineRunMetricParams) {
    let outcome = params.outcome.to_string();
    counter!("pipeline_runs_total", "outcome" => outcome.clone()).increment(1);
    histogram!("pipeline_attempts", "outcome" => outcome.clone()).record(f64::from(params.attempts));
    histogram!("pipeline_duration_seconds", "outcome" => outcome)
        .record(params.duration.as_secs_f64());
}

/// Replace session ids so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");

    if path.len() > 50 {
        path.chars().take(50).collect()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_session_path() {
        let path = "/api/context/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(sanitize_path(path), "/api/context/{id}");
    }

    #[test]
    fn test_sanitize_plain_path() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup(true);
        record_cache_eviction();
        record_llm_call("gemini-2.0-flash", false, Duration::from_millis(20));
        record_fallback("gemini-2.0-flash", "gemini-1.5-flash");
        record_pipeline_run(PipelineRunMetricParams {
            outcome: "responded",
            attempts: 2,
            duration: Duration::from_millis(150),
        });
    }
}
