//! Protocol session: handshake, state gate and envelope formatting
//!
//! A session starts `Uninitialized`. A handshake whose `protocol_version`
//! equals the server's exactly moves it to `Active`; nothing else does.
//! `close_session` moves it to `Closed`, from which only a new successful
//! handshake returns to `Active`.
//!
//! ```text
//! Uninitialized --handshake ok--> Active --close--> Closed
//!                                   ^                 |
//!                                   +--handshake ok---+
//! ```
//!
//! While `Active`, [`ProtocolSession::process_request`] gates every call:
//! structure, advertised method, and coarse parameter shape. Anything that
//! fails here is answered directly and never reaches the router.

use crate::capability::{CapabilityDescriptor, ServerInfo};
use crate::config::ServerConfig;
use crate::schema::SchemaCatalog;
use crate::validator;
use olrpc_core::{codes, Error, Id, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Active,
    Closed,
}

/// Reply to a successful handshake
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandshakeResult {
    pub protocol_version: String,
    pub capabilities: CapabilityDescriptor,
    pub server_info: ServerInfo,
}

/// What the session decided about a request
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Hand the request to the router
    Dispatch,
    /// Answer with this response; the router is not called
    Respond(JsonRpcResponse),
}

/// Handshake state and capability gate for one client
pub struct ProtocolSession {
    protocol_version: String,
    server_info: ServerInfo,
    catalog: Arc<SchemaCatalog>,
    capabilities: CapabilityDescriptor,
    state: SessionState,
    client_info: Option<Map<String, Value>>,
}

impl ProtocolSession {
    /// Create an uninitialized session advertising the catalog's methods
    pub fn new(config: &ServerConfig, catalog: Arc<SchemaCatalog>) -> Self {
        let capabilities = CapabilityDescriptor::from_catalog(&catalog);
        Self {
            protocol_version: config.protocol_version.clone(),
            server_info: ServerInfo {
                name: config.server_name.clone(),
                version: config.server_version.clone(),
            },
            catalog,
            capabilities,
            state: SessionState::Uninitialized,
            client_info: None,
        }
    }

    /// Negotiate the protocol version
    ///
    /// # Errors
    ///
    /// `Error::Validation` when `client_info` is not an object, lacks a string
    /// `protocol_version`, or names a different version. The state is left
    /// unchanged.
    pub fn handshake(&mut self, client_info: &Value) -> Result<HandshakeResult> {
        let info = client_info.as_object().ok_or_else(|| Error::Validation {
            field: None,
            message: "client_info must be an object".into(),
        })?;
        let requested = info
            .get("protocol_version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation("protocol_version", "protocol_version must be a string")
            })?;

        if requested != self.protocol_version {
            tracing::warn!(
                requested = %requested,
                supported = %self.protocol_version,
                "handshake rejected: protocol version mismatch"
            );
            return Err(Error::validation(
                "protocol_version",
                format!(
                    "Unsupported protocol version: {} (server supports {})",
                    requested, self.protocol_version
                ),
            ));
        }

        self.client_info = Some(info.clone());
        self.state = SessionState::Active;
        tracing::info!(
            protocol_version = %self.protocol_version,
            tools = self.capabilities.tools.len(),
            "session active"
        );

        Ok(HandshakeResult {
            protocol_version: self.protocol_version.clone(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
        })
    }

    /// Gate a request before routing
    pub fn process_request(&self, request: &JsonRpcRequest) -> ProcessOutcome {
        let id = request.id().clone();

        if self.state != SessionState::Active {
            let err = Error::SessionInactive(request.method().to_string());
            return ProcessOutcome::Respond(Self::format_error(&err, id));
        }
        if let Err(err) = request.validate() {
            return ProcessOutcome::Respond(Self::format_error(&err, id));
        }
        if !self.capabilities.has_tool(request.method()) {
            let err = Error::MethodNotFound {
                method: request.method().to_string(),
                available: self
                    .capabilities
                    .tool_names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            };
            return ProcessOutcome::Respond(Self::format_error(&err, id));
        }
        if let Some(schema) = self.catalog.get(request.method()) {
            if let Err(err) = validator::check_shape(schema, request.params()) {
                tracing::debug!(method = %request.method(), error = %err, "request shape rejected");
                return ProcessOutcome::Respond(Self::format_error(&err, id));
            }
        }
        ProcessOutcome::Dispatch
    }

    /// End the session; idempotent
    pub fn close_session(&mut self) {
        if self.state == SessionState::Active {
            tracing::info!("session closed");
        }
        self.client_info = None;
        self.state = SessionState::Closed;
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while `Active`
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Client info from the last successful handshake
    pub fn client_info(&self) -> Option<&Map<String, Value>> {
        self.client_info.as_ref()
    }

    /// The advertised capabilities
    pub fn capabilities(&self) -> &CapabilityDescriptor {
        &self.capabilities
    }

    /// The version this session accepts
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Wrap a result in a success envelope
    pub fn format_response(data: Value, id: Id) -> JsonRpcResponse {
        JsonRpcResponse::success(data, id)
    }

    /// Wrap an error in an error envelope
    pub fn format_error(error: &Error, id: Id) -> JsonRpcResponse {
        Self::format_error_with_data(error, id, Map::new())
    }

    /// Wrap an error, merging `extra` into the error's own `data`
    ///
    /// `data` is omitted when both are empty.
    pub fn format_error_with_data(error: &Error, id: Id, extra: Map<String, Value>) -> JsonRpcResponse {
        let code = error.code().unwrap_or_else(|| {
            let bucket = ErrorBucket::from_message(&error.to_string());
            tracing::warn!(
                bucket = ?bucket,
                error = %error,
                "untyped error categorized by message text"
            );
            bucket.code()
        });

        let mut data = Map::new();
        match error {
            Error::MethodNotFound { available, .. } => {
                data.insert("available".into(), json!(available));
            }
            Error::Validation {
                field: Some(field), ..
            } => {
                data.insert("field".into(), json!(field));
            }
            _ => {}
        }
        data.extend(extra);

        let payload = if data.is_empty() {
            JsonRpcErrorData::new(code, error.to_string())
        } else {
            JsonRpcErrorData::with_data(code, error.to_string(), Value::Object(data))
        };
        JsonRpcResponse::error(payload, id)
    }
}

/// Coarse category for errors that carry no kind of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBucket {
    Validation,
    Connection,
    Access,
    Server,
}

impl ErrorBucket {
    const CONNECTION_WORDS: &'static [&'static str] =
        &["outlook", "com", "connection", "connect", "disconnected"];
    const ACCESS_WORDS: &'static [&'static str] =
        &["permission", "access", "denied", "unauthorized"];
    const VALIDATION_WORDS: &'static [&'static str] = &["invalid", "validation", "required"];

    /// Categorize by whole words of the message
    ///
    /// Words that are part of an e-mail address are skipped, so
    /// `alice@example.com` does not read as a COM failure.
    pub fn from_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let words: Vec<&str> = lowered
            .split_whitespace()
            .filter(|chunk| !chunk.contains('@'))
            .flat_map(|chunk| chunk.split(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |set: &[&str]| words.iter().any(|w| set.contains(w));

        if has_any(Self::CONNECTION_WORDS) {
            ErrorBucket::Connection
        } else if has_any(Self::ACCESS_WORDS) {
            ErrorBucket::Access
        } else if has_any(Self::VALIDATION_WORDS) {
            ErrorBucket::Validation
        } else {
            ErrorBucket::Server
        }
    }

    /// Wire code of the bucket
    pub fn code(self) -> i32 {
        match self {
            ErrorBucket::Validation => codes::VALIDATION_ERROR,
            ErrorBucket::Connection => codes::CONNECTION_ERROR,
            ErrorBucket::Access => codes::ACCESS_ERROR,
            ErrorBucket::Server => codes::SERVER_ERROR,
        }
    }
}
