use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub partner_assignments_total: IntCounterVec,
    pub status_transitions_total: IntCounterVec,
    pub metrics_refresh_seconds: Histogram,
    pub partner_load: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let partner_assignments_total = IntCounterVec::new(
            Opts::new(
                "partner_assignments_total",
                "Partner-to-order assignment attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid partner_assignments_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Applied order status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let metrics_refresh_seconds = Histogram::with_opts(HistogramOpts::new(
            "metrics_refresh_seconds",
            "Duration of assignment metrics recomputation in seconds",
        ))
        .expect("valid metrics_refresh_seconds metric");

        let partner_load = IntGaugeVec::new(
            Opts::new("partner_load", "Current number of open orders per partner"),
            &["partner_id"],
        )
        .expect("valid partner_load metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(partner_assignments_total.clone()))
            .expect("register partner_assignments_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(metrics_refresh_seconds.clone()))
            .expect("register metrics_refresh_seconds");
        registry
            .register(Box::new(partner_load.clone()))
            .expect("register partner_load");

        Self {
            registry,
            orders_created_total,
            partner_assignments_total,
            status_transitions_total,
            metrics_refresh_seconds,
            partner_load,
        }
    }

    pub fn record_partner_load(&self, partner_id: &str, load: u32) {
        self.partner_load
            .with_label_values(&[partner_id])
            .set(i64::from(load));
    }

    pub fn forget_partner(&self, partner_id: &str) {
        let _ = self.partner_load.remove_label_values(&[partner_id]);
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
