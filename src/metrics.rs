use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the pipeline series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("briefing_runs_total", "Pipeline runs started.");
        describe_counter!(
            "briefing_runs_failed_total",
            "Pipeline runs that failed, labelled by error kind."
        );
        describe_counter!(
            "briefing_sources_total",
            "Sources attached to completed reports."
        );
        describe_histogram!("briefing_stage_ms", "Backend call latency per stage in milliseconds.");
        describe_histogram!("briefing_run_ms", "End-to-end successful run time in milliseconds.");

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Process-wide recorder; `None` when another recorder was installed first.
pub fn global() -> Option<&'static Metrics> {
    static METRICS: OnceCell<Option<Metrics>> = OnceCell::new();
    METRICS
        .get_or_init(|| match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = ?e, "metrics disabled");
                None
            }
        })
        .as_ref()
}
