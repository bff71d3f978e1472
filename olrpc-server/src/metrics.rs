//! Server metrics definitions
//!
//! OpenTelemetry instruments for request and error activity. They are
//! exported through whatever meter provider is installed globally; with
//! `ObservabilityConfig::with_metrics(true)` that is the OTLP exporter,
//! otherwise recording is a no-op.
//!
//! # Metrics Collected
//!
//! - **olrpc.server.requests.total**: requests by method and status (counter)
//! - **olrpc.server.request.duration**: handling latency in seconds (histogram)
//! - **olrpc.server.errors.total**: handled errors by type and severity (counter)
//! - **olrpc.server.recoveries.total**: recovery attempts by outcome (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use olrpc_server::ServerMetrics;
//! use olrpc_core::Severity;
//!
//! let metrics = ServerMetrics::new("olrpc");
//! metrics.record_request("list_emails", "success", 0.025);
//! metrics.record_error("EmailNotFound", Severity::Medium);
//! ```

use olrpc_core::Severity;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Instruments recorded by the server and error handler
pub struct ServerMetrics {
    pub requests_total: Counter<u64>,
    /// Seconds from decode to encoded reply
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub recoveries_total: Counter<u64>,
}

impl ServerMetrics {
    /// Instruments on the global meter for `scope`
    pub fn new(scope: &'static str) -> Self {
        let meter = global::meter(scope);
        Self::new_with_meter(&meter)
    }

    /// Instruments on a caller-supplied meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("olrpc.server.requests.total")
                .with_description("Total number of requests processed")
                .build(),
            request_duration: meter
                .f64_histogram("olrpc.server.request.duration")
                .with_description("Request processing duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("olrpc.server.errors.total")
                .with_description("Total number of errors handled")
                .build(),
            recoveries_total: meter
                .u64_counter("olrpc.server.recoveries.total")
                .with_description("Recovery strategy invocations")
                .build(),
        }
    }

    /// Record a completed request
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record a handled error
    pub fn record_error(&self, error_type: &str, severity: Severity) {
        let attributes = &[
            KeyValue::new("error_type", error_type.to_string()),
            KeyValue::new("severity", severity.as_str()),
        ];
        self.errors_total.add(1, attributes);
    }

    /// Record a strategy run; `recovered` is true when it produced a response
    pub fn record_recovery(&self, error_type: &str, recovered: bool) {
        let attributes = &[
            KeyValue::new("error_type", error_type.to_string()),
            KeyValue::new("recovered", recovered),
        ];
        self.recoveries_total.add(1, attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ServerMetrics::new("olrpc-test");

        metrics.record_request("get_email", "success", 0.1);
        metrics.record_error("EmailNotFound", Severity::Medium);
        metrics.record_recovery("Timeout", false);
    }

    #[test]
    fn test_request_metrics() {
        let metrics = ServerMetrics::new("olrpc-test-req");

        metrics.record_request("list_emails", "success", 0.05);
        metrics.record_request("search_emails", "success", 0.03);
        metrics.record_request("get_email", "error", 0.01);

        for severity in Severity::ALL {
            metrics.record_error("Untyped", severity);
        }
    }
}
