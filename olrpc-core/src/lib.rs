//! Core envelopes and error taxonomy for olrpc
//!
//! This crate provides the value types every other layer is built on:
//!
//! - **Types**: Self-validating request, response and notification envelopes
//! - **Error**: Typed failures, their kinds and the fixed wire-code table
//! - **Severity**: Static classification of error kinds
//! - **Codec**: Text to envelope and back, with parse/invalid-request mapping
//! - **Observability**: `tracing` subscriber and OTLP bootstrap
//!
//! # Example
//!
//! ```rust
//! use olrpc_core::{codec, JsonRpcRequest};
//! use serde_json::json;
//!
//! let params = json!({"limit": 10}).as_object().cloned().unwrap();
//! let request = JsonRpcRequest::new("req-1", "list_emails", params).unwrap();
//!
//! let text = codec::encode_request(&request).unwrap();
//! let decoded = codec::decode_request(&text).unwrap();
//! assert_eq!(decoded, request);
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod severity;
pub mod types;

pub use error::{codes, Error, ErrorKind, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use severity::Severity;
pub use types::{
    Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Params,
    JSONRPC_VERSION,
};
