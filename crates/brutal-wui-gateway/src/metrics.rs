//! Prometheus metrics recording.
//!
//! With the `metrics` feature disabled every recorder is a no-op, so call
//! sites stay unconditional.

#[cfg(feature = "metrics")]
mod imp {
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

    /// Install the Prometheus metrics recorder and return the handle for rendering.
    pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
        Ok(PrometheusBuilder::new().install_recorder()?)
    }

    pub fn record_session_open() {
        metrics::gauge!("wui_sessions_active").increment(1.0);
    }

    pub fn record_session_close() {
        metrics::gauge!("wui_sessions_active").decrement(1.0);
    }

    pub fn record_broadcast(kind: &'static str) {
        metrics::counter!("wui_broadcasts_total", "kind" => kind).increment(1);
    }

    pub fn record_send_failure() {
        metrics::counter!("wui_send_failures_total").increment(1);
    }

    pub fn record_inbound_event() {
        metrics::counter!("wui_inbound_events_total").increment(1);
    }

    pub fn record_callback_error(callback: &'static str) {
        metrics::counter!("wui_callback_errors_total", "callback" => callback).increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    pub fn record_session_open() {}

    pub fn record_session_close() {}

    pub fn record_broadcast(_kind: &'static str) {}

    pub fn record_send_failure() {}

    pub fn record_inbound_event() {}

    pub fn record_callback_error(_callback: &'static str) {}
}

pub use imp::*;
