//! Server builder for constructing mailbox servers
//!
//! The builder provides a fluent API for configuring and creating a
//! [`MailboxServer`]. It allows you to:
//! - Set the protocol version and server identity reported at handshake
//! - Replace or extend the schema catalog
//! - Register method handlers
//! - Register recovery strategies and share error counters
//! - Enable observability and metrics
//!
//! # Examples
//!
//! ```rust,no_run
//! use olrpc_server::{MailboxServer, from_fn};
//!
//! # async fn example() -> olrpc_core::Result<()> {
//! let server = MailboxServer::builder()
//!     .server_name("outlook-bridge")
//!     .handler("get_folders", from_fn(|_| async {
//!         Ok(serde_json::json!([{"name": "Inbox"}]))
//!     }))
//!     .default_recovery_strategies()
//!     .build()?;
//!
//! server.serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    ErrorHandler, ErrorStats, Handler, MailboxServer, ProtocolSession, RecoveryStrategy, Router,
    SchemaCatalog, ServerConfig, ServerMetrics,
};
use olrpc_core::{Error, ErrorKind, ObservabilityConfig, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Builder for constructing a mailbox server
pub struct ServerBuilder {
    config: ServerConfig,
    catalog: SchemaCatalog,
    handlers: Vec<(String, Box<dyn Handler>)>,
    error_handler: ErrorHandler,
    observability_config: Option<ObservabilityConfig>,
    metrics: bool,
}

impl ServerBuilder {
    /// Start from the mailbox catalog and default identity
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: SchemaCatalog::mailbox(),
            handlers: Vec::new(),
            error_handler: ErrorHandler::new(),
            observability_config: None,
            metrics: false,
        }
    }

    /// The only protocol version handshakes may request
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.protocol_version = version.into();
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.config.server_version = version.into();
        self
    }

    /// Replace the schema catalog
    pub fn catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Register a handler for a method
    pub fn handler(mut self, method: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.handlers.push((method.into(), handler));
        self
    }

    /// Register a recovery strategy for one error kind
    pub fn recovery_strategy(mut self, kind: ErrorKind, strategy: impl RecoveryStrategy + 'static) -> Self {
        self.error_handler.register_retry_strategy(kind, strategy);
        self
    }

    /// Register the stock connection and timeout strategies
    pub fn default_recovery_strategies(mut self) -> Self {
        self.error_handler = self.error_handler.with_default_strategies();
        self
    }

    /// Count errors into an existing handle
    pub fn error_stats(mut self, stats: ErrorStats) -> Self {
        self.error_handler = self.error_handler.with_stats(stats);
        self
    }

    /// Record OpenTelemetry metrics on the global meter
    pub fn with_metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    /// Install the tracing subscriber (and OTLP exporters) when building
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Build the server
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRequest` for an empty method name
    /// - `Error::Internal` when observability cannot be initialized
    pub fn build(self) -> Result<MailboxServer> {
        if let Some(config) = self.observability_config {
            olrpc_core::init_observability(config)
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;
        }

        let mut router = Router::with_catalog(self.catalog);
        for (method, handler) in self.handlers {
            router.register_handler(method, handler)?;
        }

        let metrics = self.metrics.then(|| Arc::new(ServerMetrics::new("olrpc")));
        let error_handler = match &metrics {
            Some(m) => self.error_handler.with_metrics(Arc::clone(m)),
            None => self.error_handler,
        };

        let session = ProtocolSession::new(&self.config, Arc::clone(router.catalog()));
        let unhandled: Vec<&str> = session
            .capabilities()
            .tool_names()
            .into_iter()
            .filter(|name| !router.has_method(name))
            .collect();
        if !unhandled.is_empty() {
            tracing::warn!(methods = ?unhandled, "advertised methods have no handler");
        }

        tracing::info!(
            server = %self.config.server_name,
            protocol_version = %self.config.protocol_version,
            methods = ?router.methods(),
            "server built"
        );

        Ok(MailboxServer {
            session: Mutex::new(session),
            router,
            error_handler,
            metrics,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use crate::SessionState;
    use olrpc_core::{JsonRpcResponse, Severity};

    #[test]
    fn test_builder_basic() {
        let server = ServerBuilder::new()
            .handler("get_folders", from_fn(|_| async { Ok(serde_json::json!([])) }))
            .build()
            .unwrap();

        assert!(server.router().has_method("get_folders"));
    }

    #[test]
    fn test_builder_empty_method_name() {
        let result = ServerBuilder::new()
            .handler("", from_fn(|_| async { Ok(serde_json::Value::Null) }))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_builder_identity() {
        let server = ServerBuilder::new()
            .protocol_version("2025-01-01")
            .server_name("bridge")
            .server_version("9.9.9")
            .build()
            .unwrap();

        assert_eq!(server.session_state().await, SessionState::Uninitialized);
        let session = server.session.lock().await;
        assert_eq!(session.protocol_version(), "2025-01-01");
    }

    #[test]
    fn test_builder_shares_error_stats() {
        let stats = ErrorStats::new();
        let server = ServerBuilder::new().error_stats(stats.clone()).build().unwrap();

        stats.record_error(ErrorKind::Timeout, Severity::High);
        assert_eq!(server.error_statistics().total_errors, 1);
    }

    #[test]
    fn test_builder_strategies() {
        let server = ServerBuilder::new()
            .default_recovery_strategies()
            .recovery_strategy(
                ErrorKind::FolderNotFound,
                |_: &Error, _: &crate::ErrorContext| -> Result<Option<JsonRpcResponse>> { Ok(None) },
            )
            .with_metrics()
            .build()
            .unwrap();

        let handler = server.error_handler();
        assert!(handler.has_strategy(ErrorKind::ConnectionLost));
        assert!(handler.has_strategy(ErrorKind::Timeout));
        assert!(handler.has_strategy(ErrorKind::FolderNotFound));
        assert!(!handler.has_strategy(ErrorKind::EmailNotFound));
    }
}
