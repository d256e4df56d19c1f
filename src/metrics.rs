//! Process-wide connection counters (§2 item 7), exposed at `/metrics`.
//!
//! A plain `prometheus::Registry` of `IntGauge`s, deliberately simpler than
//! the OpenTelemetry histogram pipeline the teacher wires up for request
//! latency — there is no per-request timing surface here, just counters the
//! event loop increments and decrements as it processes commands.

use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub sse_clients: IntGauge,
    pub native_clients: IntGauge,
    pub index_buckets: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sse_clients = IntGauge::new(
            "plasma_connected_sse_clients",
            "Currently registered clients connected over SSE",
        )
        .expect("metric names are static and valid");
        let native_clients = IntGauge::new(
            "plasma_connected_native_clients",
            "Currently registered clients connected over the native streaming RPC",
        )
        .expect("metric names are static and valid");
        let index_buckets = IntGauge::new(
            "plasma_index_buckets",
            "Number of distinct event-type keys currently materialized in the subscription index",
        )
        .expect("metric names are static and valid");

        registry
            .register(Box::new(sse_clients.clone()))
            .expect("metric registered exactly once");
        registry
            .register(Box::new(native_clients.clone()))
            .expect("metric registered exactly once");
        registry
            .register(Box::new(index_buckets.clone()))
            .expect("metric registered exactly once");

        Metrics {
            registry,
            sse_clients,
            native_clients,
            index_buckets,
        }
    }

    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::new()
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .expect("text encoding never fails for well-formed metric families");
        String::from_utf8(buf).expect("prometheus text encoder only emits valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = Metrics::new();
        metrics.sse_clients.inc();
        metrics.native_clients.inc();
        let text = metrics.render();
        assert!(text.contains("plasma_connected_sse_clients"));
        assert!(text.contains("plasma_connected_native_clients"));
        assert!(text.contains("plasma_index_buckets"));
    }
}
