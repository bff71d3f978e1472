//! Request lifecycle for a mailbox JSON-RPC server
//!
//! This crate turns decoded envelopes into responses. It sits between a
//! line-oriented transport and the mail-store handlers, and owns everything
//! in between: the handshake, the per-call gate, parameter validation,
//! dispatch, and error handling.
//!
//! # Core Features
//!
//! - **Session**: Version handshake and an `Uninitialized → Active → Closed` gate
//! - **Schema catalog**: One declaration per method drives both the advertised
//!   capabilities and the validator
//! - **Routing**: Handlers receive validated, default-filled parameters
//! - **Error handling**: Severity-keyed logging, shared counters, optional
//!   recovery strategies, diagnostic `data` on every error envelope
//! - **Transport**: Newline-delimited JSON over any tokio reader/writer
//! - **Observability**: `tracing` everywhere, optional OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use olrpc_server::{MailboxServer, from_typed_fn};
//! use olrpc_core::Error;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct GetEmail { email_id: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = MailboxServer::builder()
//!         .handler("get_email", from_typed_fn(|p: GetEmail| async move {
//!             Err::<serde_json::Value, _>(Error::EmailNotFound(p.email_id))
//!         }))
//!         .build()?;
//!
//!     server.serve_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Request Flow
//!
//! ```text
//! line ──decode──> request ──"initialize"──> handshake
//!                     │
//!                     ├──"shutdown"──> close session
//!                     │
//!                     └──> session gate ──> router ──> handler
//!                              │              │          │
//!                              └── answered   └──────────┴──> error handler
//!                                  directly
//! ```
//!
//! Failures stopped at the session gate are answered with the plain protocol
//! error. Failures from the router or a handler go through the
//! [`ErrorHandler`], which counts them and attaches diagnostic data.

mod builder;
mod capability;
mod config;
mod connection;
mod context;
mod error_handler;
mod handler;
mod metrics;
pub mod recovery;
mod router;
pub mod schema;
mod session;
mod stats;
pub mod validator;

pub use builder::ServerBuilder;
pub use capability::{CapabilityDescriptor, ServerInfo, ToolDescriptor};
pub use config::ServerConfig;
pub use context::ErrorContext;
pub use error_handler::ErrorHandler;
pub use handler::{from_fn, from_typed_fn, AsyncHandler, Handler, HandlerResult};
pub use metrics::ServerMetrics;
pub use recovery::{ConnectionRetry, ExponentialBackoff, RecoveryStrategy, TimeoutRetry};
pub use router::{Router, RouterBuilder};
pub use schema::{MethodSchema, ParamKind, ParamSpec, SchemaCatalog};
pub use session::{ErrorBucket, HandshakeResult, ProcessOutcome, ProtocolSession, SessionState};
pub use stats::{ErrorStatistics, ErrorStats};

use olrpc_core::{codec, Error, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Method name that performs the handshake
pub const INITIALIZE_METHOD: &str = "initialize";
/// Method name that closes the session
pub const SHUTDOWN_METHOD: &str = "shutdown";

/// A mailbox JSON-RPC server
///
/// The session sits behind an async mutex that is held only while the
/// session itself is consulted, never across a handler call. The router is
/// immutable once built and error counters synchronize internally.
pub struct MailboxServer {
    session: Mutex<ProtocolSession>,
    router: Router,
    error_handler: ErrorHandler,
    metrics: Option<Arc<ServerMetrics>>,
}

impl MailboxServer {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Answer one request
    ///
    /// Always produces exactly one response envelope carrying the request's id.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), id = %request.id()))]
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let start = Instant::now();

        let response = match request.method() {
            INITIALIZE_METHOD => self.initialize(request).await,
            SHUTDOWN_METHOD => {
                self.session.lock().await.close_session();
                ProtocolSession::format_response(json!({}), request.id().clone())
            }
            _ => self.dispatch(request).await,
        };

        if let Some(metrics) = &self.metrics {
            let status = if response.is_success() { "success" } else { "error" };
            metrics.record_request(request.method(), status, start.elapsed().as_secs_f64());
        }
        response
    }

    /// Answer one line of input
    ///
    /// Returns `None` for notifications, which are never answered.
    pub async fn handle_message(&self, text: &str) -> Option<String> {
        let response = match codec::decode(text) {
            Ok(JsonRpcMessage::Request(request)) => self.handle_request(&request).await,
            Ok(JsonRpcMessage::Notification(notification)) => {
                tracing::debug!(method = %notification.method, "notification received");
                return None;
            }
            Err(failure) => {
                tracing::debug!(error = %failure.error, "undecodable message");
                ProtocolSession::format_error(&failure.error, failure.id)
            }
        };

        match codec::encode_response(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                None
            }
        }
    }

    /// Serve newline-delimited JSON until `reader` reaches EOF
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: tokio::io::AsyncWrite + Unpin,
    {
        connection::handle_connection(self, reader, writer).await
    }

    /// Serve on stdin and stdout
    pub async fn serve_stdio(&self) -> Result<()> {
        tracing::info!("serving on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Current session state
    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Snapshot of the error counters
    pub fn error_statistics(&self) -> ErrorStatistics {
        self.error_handler.get_error_statistics()
    }

    pub fn reset_error_statistics(&self) {
        self.error_handler.reset_error_statistics();
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    async fn initialize(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let client_info = Value::Object(request.params().clone());
        let outcome = self.session.lock().await.handshake(&client_info);

        match outcome.and_then(|result| serde_json::to_value(result).map_err(Error::from)) {
            Ok(result) => ProtocolSession::format_response(result, request.id().clone()),
            Err(e) => self.error_handler.handle_error(&e, &ErrorContext::from_request(request)),
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let (outcome, client_info) = {
            let session = self.session.lock().await;
            (session.process_request(request), session.client_info().cloned())
        };
        if let ProcessOutcome::Respond(response) = outcome {
            return response;
        }

        match self.router.route_request(request).await {
            Ok(result) => ProtocolSession::format_response(result, request.id().clone()),
            Err(e) => {
                let mut ctx = ErrorContext::from_request(request);
                if let Some(info) = client_info {
                    if let Some(agent) = info.get("user_agent").and_then(Value::as_str) {
                        ctx = ctx.with_user_agent(agent);
                    }
                    ctx = ctx.with_client_info(info);
                }
                self.error_handler.handle_error(&e, &ctx)
            }
        }
    }
}
