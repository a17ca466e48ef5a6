use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Process-wide recorder; the global recorder can only be installed once.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install (or reuse) the Prometheus recorder and describe the series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            describe();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
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

fn describe() {
    describe_counter!("aggregate_requests_total", "Aggregations started, per family.");
    describe_counter!(
        "aggregate_source_failures_total",
        "Adapter failures replaced by fallback data, per source."
    );
    describe_counter!(
        "aggregate_total_failures_total",
        "Aggregations where every source fell back."
    );
    describe_histogram!("aggregate_duration_ms", "Aggregation wall time in milliseconds.");
    describe_counter!("contact_sent_total", "Contact emails handed to the transport.");
    describe_counter!("contact_rejected_total", "Contact submissions failing validation.");
    describe_counter!(
        "contact_transport_errors_total",
        "Contact submissions the mail transport failed to send."
    );
}
