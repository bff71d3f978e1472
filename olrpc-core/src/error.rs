//! Error types for olrpc
//!
//! This module provides the error taxonomy shared by every layer of the
//! request lifecycle. It defines three related types:
//!
//! - **Error**: Typed failure raised by envelopes, the session, the router and
//!   handlers (uses thiserror)
//! - **ErrorKind**: Fieldless discriminant of `Error`, used as a lookup key for
//!   severity classification, recovery strategies and statistics
//! - **JsonRpcErrorData**: Wire-format error object placed in a response
//!
//! # Error Codes
//!
//! The code table is fixed for client compatibility:
//! - `-32700`: Parse error
//! - `-32600`: Invalid request
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//! - `-32000`: Generic server error
//! - `-32001`: Upstream connection error
//! - `-32002`: Upstream access error
//! - `-32003`: Validation error
//!
//! Domain errors reuse the server range. Note that `EMAIL_NOT_FOUND` shares
//! `-32003` with `VALIDATION_ERROR`; both codes are kept as observed.
//!
//! # Examples
//!
//! ```rust
//! use olrpc_core::{codes, Error, ErrorKind};
//!
//! let error = Error::EmailNotFound("AAMkAD".into());
//! assert_eq!(error.kind(), ErrorKind::EmailNotFound);
//! assert_eq!(error.code(), Some(codes::EMAIL_NOT_FOUND));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for olrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes carried in `JsonRpcErrorData::code`
pub mod codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON is not a valid request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Generic server error
    pub const SERVER_ERROR: i32 = -32000;
    /// The mail store could not be reached
    pub const CONNECTION_ERROR: i32 = -32001;
    /// The mail store refused access
    pub const ACCESS_ERROR: i32 = -32002;
    /// Parameter failed semantic validation
    pub const VALIDATION_ERROR: i32 = -32003;
    /// No message with the requested identifier
    pub const EMAIL_NOT_FOUND: i32 = -32003;
    /// No folder with the requested name or identifier
    pub const FOLDER_NOT_FOUND: i32 = -32004;
    /// The mail store accepted the request but could not send the message
    pub const SEND_FAILED: i32 = -32005;
    /// The mail store did not answer in time
    pub const TIMEOUT: i32 = -32007;
}

/// Application-level error type for olrpc operations
///
/// Handlers raise these and never build protocol responses themselves; only
/// the error handler turns an `Error` into an envelope.
///
/// # Error Categories
///
/// - **Protocol**: Parse, InvalidRequest, InvalidResponse, SessionInactive,
///   MethodNotFound, InvalidParams
/// - **Validation**: Validation
/// - **Lookup**: EmailNotFound, FolderNotFound
/// - **Upstream**: PermissionDenied, Timeout, ConnectionLost, SendFailed
/// - **Processing**: Internal, Serialization, Io
/// - **Untyped**: a bare message from a collaborator that did not classify it
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid JSON text
    #[error("Parse error: {0}")]
    Parse(String),

    /// The message is JSON but not a well-formed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A response was built with both or neither of `result` and `error`
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A method was called before a successful handshake
    #[error("No active session: handshake required before calling '{0}'")]
    SessionInactive(String),

    /// No handler is registered for the method
    #[error("Method not found: {method}")]
    MethodNotFound {
        /// The requested method name
        method: String,
        /// Methods that are currently registered, sorted
        available: Vec<String>,
    },

    /// Parameters do not match the advertised input shape
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// A parameter failed router-level validation
    #[error("Validation error: {message}")]
    Validation {
        /// The offending parameter, when one can be named
        field: Option<String>,
        /// Human-readable description
        message: String,
    },

    /// No message with this identifier
    #[error("Email not found: {0}")]
    EmailNotFound(String),

    /// No folder with this name or identifier
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// The mail store refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The mail store did not answer in time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The connection to the mail store was lost
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The message could not be sent
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Unexpected failure inside the server
    #[error("Internal error: {0}")]
    Internal(String),

    /// Converting between Rust types and JSON failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Reading or writing the transport failed
    #[error("IO error: {0}")]
    Io(String),

    /// Failure from a collaborator that carries only a message
    ///
    /// These are the only errors categorized by message text.
    #[error("{0}")]
    Untyped(String),
}

impl Error {
    /// Shorthand for a validation failure tied to one parameter
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// The fieldless kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::SessionInactive(_) => ErrorKind::SessionInactive,
            Error::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            Error::InvalidParams(_) => ErrorKind::InvalidParams,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::EmailNotFound(_) => ErrorKind::EmailNotFound,
            Error::FolderNotFound(_) => ErrorKind::FolderNotFound,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Error::SendFailed(_) => ErrorKind::SendFailed,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Io(_) => ErrorKind::Io,
            Error::Untyped(_) => ErrorKind::Untyped,
        }
    }

    /// The wire code declared by this error's kind
    ///
    /// Returns `None` for `Error::Untyped`, whose bucket is decided by the
    /// session's message fallback.
    pub fn code(&self) -> Option<i32> {
        let code = match self {
            Error::Parse(_) => codes::PARSE_ERROR,
            Error::InvalidRequest(_) | Error::SessionInactive(_) => codes::INVALID_REQUEST,
            Error::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Error::InvalidParams(_) => codes::INVALID_PARAMS,
            Error::Validation { .. } => codes::VALIDATION_ERROR,
            Error::EmailNotFound(_) => codes::EMAIL_NOT_FOUND,
            Error::FolderNotFound(_) => codes::FOLDER_NOT_FOUND,
            Error::PermissionDenied(_) => codes::ACCESS_ERROR,
            Error::Timeout(_) => codes::TIMEOUT,
            Error::ConnectionLost(_) => codes::CONNECTION_ERROR,
            Error::SendFailed(_) => codes::SEND_FAILED,
            Error::InvalidResponse(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => codes::INTERNAL_ERROR,
            Error::Untyped(_) => return None,
        };
        Some(code)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Fieldless discriminant of [`Error`]
///
/// Used as the key for severity lookup, recovery strategy registration and
/// per-type statistics. `Display` renders the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    Parse,
    InvalidRequest,
    InvalidResponse,
    SessionInactive,
    MethodNotFound,
    InvalidParams,
    Validation,
    EmailNotFound,
    FolderNotFound,
    PermissionDenied,
    Timeout,
    ConnectionLost,
    SendFailed,
    Internal,
    Serialization,
    Io,
    Untyped,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [ErrorKind; 17] = [
        ErrorKind::Parse,
        ErrorKind::InvalidRequest,
        ErrorKind::InvalidResponse,
        ErrorKind::SessionInactive,
        ErrorKind::MethodNotFound,
        ErrorKind::InvalidParams,
        ErrorKind::Validation,
        ErrorKind::EmailNotFound,
        ErrorKind::FolderNotFound,
        ErrorKind::PermissionDenied,
        ErrorKind::Timeout,
        ErrorKind::ConnectionLost,
        ErrorKind::SendFailed,
        ErrorKind::Internal,
        ErrorKind::Serialization,
        ErrorKind::Io,
        ErrorKind::Untyped,
    ];

    /// Variant name, as reported in logs and statistics
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Parse => "Parse",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::InvalidResponse => "InvalidResponse",
            ErrorKind::SessionInactive => "SessionInactive",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::InvalidParams => "InvalidParams",
            ErrorKind::Validation => "Validation",
            ErrorKind::EmailNotFound => "EmailNotFound",
            ErrorKind::FolderNotFound => "FolderNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ConnectionLost => "ConnectionLost",
            ErrorKind::SendFailed => "SendFailed",
            ErrorKind::Internal => "Internal",
            ErrorKind::Serialization => "Serialization",
            ErrorKind::Io => "Io",
            ErrorKind::Untyped => "Untyped",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON-RPC 2.0 error object
///
/// This structure is the exact wire format found in the `error` field of a
/// `JsonRpcResponse`: `{code, message, data?}`. When present, `data` is
/// always a JSON object.
///
/// # Examples
///
/// ```rust
/// use olrpc_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let error = JsonRpcErrorData::method_not_found("calculate");
/// assert_eq!(error.code, -32601);
///
/// let custom = JsonRpcErrorData::with_data(
///     -32003,
///     "Email not found: AAMk",
///     json!({"severity": "medium"}),
/// );
/// assert_eq!(custom.data.unwrap()["severity"], "medium");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code, see [`codes`]
    pub code: i32,

    /// Short human-readable description
    pub message: String,

    /// Additional structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create an error object with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error object with additional data
    ///
    /// Non-object `data` is wrapped as `{"detail": data}` so the payload
    /// always stays a mapping.
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        let data = match data {
            serde_json::Value::Object(_) => data,
            other => serde_json::json!({ "detail": other }),
        };
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(codes::PARSE_ERROR, "Parse error")
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, msg)
    }

    /// Create a method not found error (-32601)
    ///
    /// ```rust
    /// use olrpc_core::JsonRpcErrorData;
    ///
    /// let error = JsonRpcErrorData::method_not_found("move_email");
    /// assert_eq!(error.message, "Method not found: move_email");
    /// ```
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, msg)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, msg)
    }
}

impl fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message", e.g. "[-32601] Method not found: foo"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::Timeout("x".into()).kind(), ErrorKind::Timeout);
        assert_eq!(
            Error::validation("limit", "too big").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::MethodNotFound {
                method: "x".into(),
                available: vec![],
            }
            .kind(),
            ErrorKind::MethodNotFound
        );
    }

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<_> = ErrorKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ErrorKind::ALL.len());
        assert_eq!(ErrorKind::EmailNotFound.to_string(), "EmailNotFound");
    }

    #[test]
    fn test_typed_codes() {
        assert_eq!(Error::Parse("x".into()).code(), Some(-32700));
        assert_eq!(Error::InvalidRequest("x".into()).code(), Some(-32600));
        assert_eq!(Error::SessionInactive("x".into()).code(), Some(-32600));
        assert_eq!(Error::InvalidParams("x".into()).code(), Some(-32602));
        assert_eq!(Error::Internal("x".into()).code(), Some(-32603));
        assert_eq!(Error::ConnectionLost("x".into()).code(), Some(-32001));
        assert_eq!(Error::PermissionDenied("x".into()).code(), Some(-32002));
        assert_eq!(Error::Timeout("x".into()).code(), Some(-32007));
        assert_eq!(Error::FolderNotFound("x".into()).code(), Some(-32004));
        assert_eq!(Error::Untyped("x".into()).code(), None);
    }

    #[test]
    fn test_validation_and_email_not_found_share_code() {
        let validation = Error::validation("email_id", "bad characters");
        let missing = Error::EmailNotFound("AAMk".into());
        assert_eq!(validation.code(), Some(codes::VALIDATION_ERROR));
        assert_eq!(missing.code(), Some(codes::EMAIL_NOT_FOUND));
        assert_eq!(validation.code(), missing.code());
        assert_ne!(validation.kind(), missing.kind());
    }

    #[test]
    fn test_error_from_serde() {
        let serde_error = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let error: Error = serde_error.into();
        assert_eq!(error.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_jsonrpc_error_with_data_keeps_object() {
        let error = JsonRpcErrorData::with_data(-32602, "Invalid params", json!({"field": "to"}));
        assert_eq!(error.data.unwrap()["field"], "to");
    }

    #[test]
    fn test_jsonrpc_error_with_scalar_data_is_wrapped() {
        let error = JsonRpcErrorData::with_data(-32000, "boom", json!("context"));
        assert_eq!(error.data, Some(json!({"detail": "context"})));
    }

    #[test]
    fn test_jsonrpc_error_display() {
        let display = JsonRpcErrorData::method_not_found("unknownMethod").to_string();
        assert!(display.contains("-32601"));
        assert!(display.contains("Method not found"));
    }

    #[test]
    fn test_standard_constructors() {
        let errors = vec![
            (JsonRpcErrorData::parse_error(), -32700),
            (JsonRpcErrorData::invalid_request("test"), -32600),
            (JsonRpcErrorData::method_not_found("test"), -32601),
            (JsonRpcErrorData::invalid_params("test"), -32602),
            (JsonRpcErrorData::internal_error("test"), -32603),
        ];

        for (error, expected_code) in errors {
            assert_eq!(error.code, expected_code);
            assert!(!error.message.is_empty());
        }
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{"code":-32601,"message":"Method not found"}"#;
        let error: JsonRpcErrorData = serde_json::from_str(json).unwrap();

        assert_eq!(error.code, -32601);
        assert!(error.data.is_none());
    }
}
