//! Metrics for a short-lived job: record in-process, push once at the end.

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reqwest::Client;

use crate::config::MetricsConfig;

pub struct MetricsPusher {
    handle: PrometheusHandle,
    client: Client,
    endpoint: String,
}

/// Install the Prometheus recorder when a push-gateway is configured.
pub fn init(cfg: &MetricsConfig) -> Option<MetricsPusher> {
    let push_url = cfg.push_url.as_deref()?;

    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Prometheus metrics recorder");
            return None;
        }
    };

    Some(MetricsPusher::new(handle, push_endpoint(push_url, &cfg.job)))
}

pub fn push_endpoint(push_url: &str, job: &str) -> String {
    format!(
        "{}/metrics/job/{}",
        push_url.trim_end_matches('/'),
        urlencoding::encode(job)
    )
}

impl MetricsPusher {
    pub fn new(handle: PrometheusHandle, endpoint: String) -> Self {
        Self {
            handle,
            client: Client::new(),
            endpoint,
        }
    }

    /// Replace this job's metric group on the gateway. Failures are logged.
    pub async fn push(&self) {
        let body = self.handle.render();
        let result = self
            .client
            .put(&self.endpoint)
            .timeout(Duration::from_secs(10))
            .header("content-type", "text/plain; version=0.0.4")
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => tracing::debug!(endpoint = %self.endpoint, "metrics pushed"),
            Err(e) => tracing::warn!(error = %e, endpoint = %self.endpoint, "metrics push failed"),
        }
    }
}
