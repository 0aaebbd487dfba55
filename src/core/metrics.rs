use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const HTTP_REQUESTS: &str = "http_requests_total";
pub(crate) const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub(crate) const USER_ANSWERS_SUBMITTED: &str = "user_answers_submitted_total";
pub(crate) const EVENTS_STARTED: &str = "events_started_total";
pub(crate) const EVENT_WARNINGS: &str = "event_warnings_total";
pub(crate) const PRESENCE_BLOCKED: &str = "presence_blocked_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    tracing::info!("Prometheus recorder installed");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_http_response(status: u16, latency: Duration) {
    let status = status.to_string();
    metrics::counter!(HTTP_REQUESTS, "status" => status.clone()).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, "status" => status).record(latency.as_secs_f64());
}

pub(crate) fn record_submission(count: usize) {
    metrics::counter!(USER_ANSWERS_SUBMITTED).increment(count as u64);
}

pub(crate) fn record_event_started() {
    metrics::counter!(EVENTS_STARTED).increment(1);
}

pub(crate) fn record_warning() {
    metrics::counter!(EVENT_WARNINGS).increment(1);
}

pub(crate) fn record_presence_blocked() {
    metrics::counter!(PRESENCE_BLOCKED).increment(1);
}
