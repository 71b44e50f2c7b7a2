use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub pickup_transitions_total: IntCounterVec,
    pub totals_latency_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pickup_transitions_total = IntCounterVec::new(
            Opts::new(
                "pickup_transitions_total",
                "Pickup status transitions by target status and outcome",
            ),
            &["target", "outcome"],
        )
        .expect("valid pickup_transitions_total metric");

        let totals_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "totals_latency_seconds",
                "Latency of courier totals computation in seconds",
            ),
            &["scope"],
        )
        .expect("valid totals_latency_seconds metric");

        registry
            .register(Box::new(pickup_transitions_total.clone()))
            .expect("register pickup_transitions_total");
        registry
            .register(Box::new(totals_latency_seconds.clone()))
            .expect("register totals_latency_seconds");

        Self {
            registry,
            pickup_transitions_total,
            totals_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
