use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub deliveries_created_total: IntCounterVec,
    pub orchestration_latency_seconds: HistogramVec,
    pub transitions_total: IntCounterVec,
    pub rate_limited_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let deliveries_created_total = IntCounterVec::new(
            Opts::new(
                "deliveries_created_total",
                "Delivery creation attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid deliveries_created_total metric");

        let orchestration_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "orchestration_latency_seconds",
                "End-to-end latency of delivery creation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid orchestration_latency_seconds metric");

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Lifecycle transitions by kind and outcome"),
            &["transition", "outcome"],
        )
        .expect("valid transitions_total metric");

        let rate_limited_total = IntCounter::new(
            "rate_limited_total",
            "Delivery creations rejected by the rate limiter",
        )
        .expect("valid rate_limited_total metric");

        registry
            .register(Box::new(deliveries_created_total.clone()))
            .expect("register deliveries_created_total");
        registry
            .register(Box::new(orchestration_latency_seconds.clone()))
            .expect("register orchestration_latency_seconds");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(rate_limited_total.clone()))
            .expect("register rate_limited_total");

        Self {
            registry,
            deliveries_created_total,
            orchestration_latency_seconds,
            transitions_total,
            rate_limited_total,
        }
    }

    pub fn record_creation(&self, outcome: &str, elapsed_secs: f64) {
        self.deliveries_created_total
            .with_label_values(&[outcome])
            .inc();
        self.orchestration_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    pub fn record_transition(&self, transition: &str, outcome: &str) {
        self.transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
