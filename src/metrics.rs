//! Observability metrics, scoped to the four signals SPEC_FULL.md names:
//! budget overflow, expansion requests by scope, confidence score, and
//! episodic compression events.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use std::sync::Arc;

pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("failed to initialize metrics")));

pub struct Metrics {
    registry: Registry,

    pub budget_overflow_total: Counter,
    pub expansion_requests_total: CounterVec,
    pub confidence_score: Histogram,
    pub compression_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let budget_overflow_total = register_counter_with_registry!(
            Opts::new(
                "fov_budget_overflow_total",
                "Times a rendered buffer would have exceeded its tier budget"
            ),
            registry
        )?;

        let expansion_requests_total = register_counter_vec_with_registry!(
            Opts::new("fov_expansion_requests_total", "Expansion requests executed"),
            &["scope"],
            registry
        )?;

        let confidence_score = register_histogram_with_registry!(
            "fov_confidence_score",
            "Confidence score produced by the confidence monitor",
            registry
        )?;

        let compression_total = register_counter_with_registry!(
            Opts::new("fov_compression_total", "Episodic buffer compression events"),
            registry
        )?;

        Ok(Self {
            registry,
            budget_overflow_total,
            expansion_requests_total,
            confidence_score,
            compression_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_budget_overflow(&self) {
        self.budget_overflow_total.inc();
    }

    pub fn record_expansion_request(&self, scope: &str) {
        self.expansion_requests_total.with_label_values(&[scope]).inc();
    }

    pub fn record_confidence(&self, confidence: f32) {
        self.confidence_score.observe(confidence as f64);
    }

    pub fn record_compression(&self) {
        self.compression_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_initialize_without_panicking() {
        let metrics = Metrics::new().unwrap();
        metrics.record_budget_overflow();
        metrics.record_expansion_request("currentTopic");
        metrics.record_confidence(0.8);
        metrics.record_compression();
    }
}
