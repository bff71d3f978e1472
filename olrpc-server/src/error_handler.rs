//! Centralized error handling
//!
//! Every failure that reaches the server facade ends here exactly once. The
//! handler classifies it, logs it at the level its severity calls for,
//! counts it (one error and one recovery attempt per call, strategy or not),
//! gives a registered recovery strategy the chance to replace the response,
//! and otherwise builds the error envelope with diagnostic data.

use crate::context::ErrorContext;
use crate::metrics::ServerMetrics;
use crate::recovery::{ConnectionRetry, RecoveryStrategy, TimeoutRetry};
use crate::session::ProtocolSession;
use crate::stats::{ErrorStatistics, ErrorStats};
use olrpc_core::{Error, ErrorKind, JsonRpcResponse, Severity};
use serde_json::{json, Map, Value};
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Classifies, logs, counts and answers failures
#[derive(Clone, Default)]
pub struct ErrorHandler {
    stats: ErrorStats,
    strategies: HashMap<ErrorKind, Arc<dyn RecoveryStrategy>>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl ErrorHandler {
    /// A handler with its own counters and no strategies
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `stats` for counting, shared with whoever else holds it
    pub fn with_stats(mut self, stats: ErrorStats) -> Self {
        self.stats = stats;
        self
    }

    /// Mirror counts into OpenTelemetry instruments
    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register the stock advice strategies for lost connections and timeouts
    pub fn with_default_strategies(mut self) -> Self {
        self.register_retry_strategy(ErrorKind::ConnectionLost, ConnectionRetry::default());
        self.register_retry_strategy(ErrorKind::Timeout, TimeoutRetry::default());
        self
    }

    /// Register the strategy for one error kind, replacing any previous one
    pub fn register_retry_strategy(&mut self, kind: ErrorKind, strategy: impl RecoveryStrategy + 'static) {
        self.strategies.insert(kind, Arc::new(strategy));
    }

    /// Whether a strategy is registered for `kind`
    pub fn has_strategy(&self, kind: ErrorKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Severity of `error`, from its kind alone
    pub fn classify_severity(&self, error: &Error) -> Severity {
        Severity::classify(error.kind())
    }

    /// The counter handle
    pub fn stats(&self) -> &ErrorStats {
        &self.stats
    }

    /// Snapshot of the counters
    pub fn get_error_statistics(&self) -> ErrorStatistics {
        self.stats.snapshot()
    }

    /// Zero the counters, including any shared through the handle
    pub fn reset_error_statistics(&self) {
        self.stats.reset();
    }

    /// Turn a failure into the response the client receives
    pub fn handle_error(&self, error: &Error, ctx: &ErrorContext) -> JsonRpcResponse {
        let kind = error.kind();
        let severity = self.classify_severity(error);

        self.log(error, kind, severity, ctx);
        self.stats.record_error(kind, severity);
        self.stats.record_recovery_attempt();
        if let Some(metrics) = &self.metrics {
            metrics.record_error(kind.name(), severity);
        }

        if let Some(response) = self.attempt_recovery(error, kind, ctx) {
            return response;
        }

        let mut data = Map::new();
        data.insert("severity".into(), json!(severity));
        data.insert("error_type".into(), json!(kind.name()));
        data.insert("request_id".into(), ctx.request_id.to_value());
        data.insert("method".into(), Value::String(ctx.method.clone()));
        data.insert("timestamp".into(), json!(ctx.timestamp.to_rfc3339()));
        data.insert("attempt".into(), json!(ctx.attempt));

        ProtocolSession::format_error_with_data(error, ctx.request_id.clone(), data)
    }

    fn attempt_recovery(&self, error: &Error, kind: ErrorKind, ctx: &ErrorContext) -> Option<JsonRpcResponse> {
        let strategy = self.strategies.get(&kind)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.recover(error, ctx)));
        let recovered = match outcome {
            Ok(Ok(Some(response))) => Some(response),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error_type = %kind, error = %e, "recovery strategy failed");
                None
            }
            Err(_) => {
                tracing::warn!(error_type = %kind, "recovery strategy panicked");
                None
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_recovery(kind.name(), recovered.is_some());
        }
        if recovered.is_some() {
            self.stats.record_recovery_success();
            tracing::info!(error_type = %kind, method = %ctx.method, "error recovered");
        }
        recovered
    }

    fn log(&self, error: &Error, kind: ErrorKind, severity: Severity, ctx: &ErrorContext) {
        let request_id = &ctx.request_id;
        let method = ctx.method.as_str();
        match severity {
            Severity::Low => tracing::info!(
                error_type = %kind, severity = %severity, request_id = %request_id, method,
                "{}", error
            ),
            Severity::Medium => tracing::warn!(
                error_type = %kind, severity = %severity, request_id = %request_id, method,
                "{}", error
            ),
            Severity::High => tracing::error!(
                error_type = %kind, severity = %severity, request_id = %request_id, method,
                backtrace = %Backtrace::force_capture(),
                "{}", error
            ),
            Severity::Critical => tracing::error!(
                error_type = %kind, severity = %severity, request_id = %request_id, method,
                critical = true,
                backtrace = %Backtrace::force_capture(),
                "{}", error
            ),
        }
    }
}
