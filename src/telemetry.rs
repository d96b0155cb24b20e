// src/telemetry.rs
use anyhow::Context;
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::insights::config::InsightsConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the active tuning as static gauges.
    pub fn init(config: &InsightsConfig) -> anyhow::Result<Self> {
        // Default buckets; the run histogram is rendered as a summary.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        crate::insights::ensure_metrics_described();
        crate::preview::ensure_metrics_described();

        gauge!("insight_chunk_size").set(config.pipeline.chunk_size as f64);
        gauge!("insight_cache_capacity").set(config.pipeline.cache_capacity as f64);
        gauge!("preview_debounce_ms").set(config.preview.debounce_ms as f64);

        Ok(Self { handle })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
