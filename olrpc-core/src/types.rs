//! JSON-RPC 2.0 envelopes
//!
//! This module implements the message shapes exchanged with mailbox clients.
//! Envelopes are self-validating value types:
//!
//! - **Request**: `jsonrpc` is exactly `"2.0"`, `id` is a non-empty string,
//!   `method` matches `[A-Za-z][A-Za-z0-9_.]*` and `params` is an object.
//! - **Response**: carries exactly one of `result` or `error`.
//! - **Notification**: a request without `id`; never answered.
//!
//! Fields are private so an envelope that exists is an envelope that passed
//! validation. Every construction path (constructor, `from_value`, serde)
//! runs the same checks.

use crate::error::{Error, JsonRpcErrorData, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Protocol version literal carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Named parameters of a request
pub type Params = Map<String, Value>;

/// JSON-RPC 2.0 message ID
///
/// Requests always carry a non-empty `Id::String`. Responses may carry
/// `Id::Null` when the request id could not be recovered (parse errors), and
/// `Id::Number` is kept so foreign ids can be echoed in error responses.
///
/// ```rust
/// use olrpc_core::Id;
///
/// let id: Id = "req-123".into();
/// assert_eq!(id.to_string(), "\"req-123\"");
/// assert_eq!(Id::Null.to_string(), "null");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier
    Number(i64),
    /// Null identifier, used only when the request id is unknown
    Null,
}

impl Id {
    /// The id as JSON
    pub fn to_value(&self) -> Value {
        match self {
            Id::String(s) => Value::String(s.clone()),
            Id::Number(n) => Value::from(*n),
            Id::Null => Value::Null,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// Whether `method` matches `[A-Za-z][A-Za-z0-9_.]*`
pub fn is_valid_method_name(method: &str) -> bool {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    }
}

/// JSON-RPC 2.0 request message
///
/// Created once per inbound message and immutable afterwards.
///
/// # Examples
///
/// ```rust
/// use olrpc_core::JsonRpcRequest;
/// use serde_json::json;
///
/// let params = json!({"email_id": "AAMkAD"}).as_object().cloned().unwrap();
/// let req = JsonRpcRequest::new("req-1", "get_email", params).unwrap();
/// assert_eq!(req.method(), "get_email");
///
/// assert!(JsonRpcRequest::new("", "get_email", Default::default()).is_err());
/// assert!(JsonRpcRequest::new("req-2", "9lives", Default::default()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct JsonRpcRequest {
    jsonrpc: String,
    id: Id,
    method: String,
    params: Params,
}

impl JsonRpcRequest {
    /// Create a validated request
    ///
    /// # Errors
    ///
    /// `Error::InvalidRequest` if the id is empty or the method name is
    /// malformed.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Params) -> Result<Self> {
        let request = Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Id::String(id.into()),
            method: method.into(),
            params,
        };
        request.validate()?;
        Ok(request)
    }

    /// Build a request from a decoded JSON value
    ///
    /// Missing `params` becomes an empty object.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawRequest = serde_json::from_value(value)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Convert back into a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "jsonrpc": self.jsonrpc,
            "id": self.id.to_value(),
            "method": self.method,
            "params": Value::Object(self.params.clone()),
        })
    }

    /// Re-check the structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(Error::InvalidRequest(format!(
                "jsonrpc must be \"{}\", got \"{}\"",
                JSONRPC_VERSION, self.jsonrpc
            )));
        }
        match &self.id {
            Id::String(s) if !s.is_empty() => {}
            Id::String(_) => {
                return Err(Error::InvalidRequest("id must be a non-empty string".into()))
            }
            other => {
                return Err(Error::InvalidRequest(format!(
                    "id must be a non-empty string, got {}",
                    other
                )))
            }
        }
        if !is_valid_method_name(&self.method) {
            return Err(Error::InvalidRequest(format!(
                "invalid method name: '{}'",
                self.method
            )));
        }
        Ok(())
    }

    /// Protocol version literal
    pub fn jsonrpc(&self) -> &str {
        &self.jsonrpc
    }

    /// Request id
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Named parameters
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Unchecked request shape, validated by `TryFrom`
#[derive(Deserialize)]
struct RawRequest {
    jsonrpc: Option<Value>,
    id: Option<Value>,
    method: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
}

impl TryFrom<RawRequest> for JsonRpcRequest {
    type Error = Error;

    fn try_from(raw: RawRequest) -> Result<Self> {
        let jsonrpc = match raw.jsonrpc {
            Some(Value::String(v)) => v,
            Some(other) => {
                return Err(Error::InvalidRequest(format!(
                    "jsonrpc must be a string, got {}",
                    other
                )))
            }
            None => return Err(Error::InvalidRequest("missing 'jsonrpc'".into())),
        };
        let id = match raw.id {
            Some(Value::String(s)) => Id::String(s),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Id::Number(i),
                None => {
                    return Err(Error::InvalidRequest(format!(
                        "id must be a non-empty string, got {}",
                        n
                    )))
                }
            },
            Some(Value::Null) | None => Id::Null,
            Some(other) => {
                return Err(Error::InvalidRequest(format!(
                    "id must be a non-empty string, got {}",
                    other
                )))
            }
        };
        let method = match raw.method {
            Some(Value::String(m)) => m,
            Some(other) => {
                return Err(Error::InvalidRequest(format!(
                    "method must be a string, got {}",
                    other
                )))
            }
            None => return Err(Error::InvalidRequest("missing 'method'".into())),
        };
        let params = match raw.params {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Params::new(),
            Some(_) => return Err(Error::InvalidRequest("params must be an object".into())),
        };

        let request = Self {
            jsonrpc,
            id,
            method,
            params,
        };
        request.validate()?;
        Ok(request)
    }
}

/// JSON-RPC 2.0 notification message
///
/// Notifications have no `id` and are never answered, even on error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Name of the method or event
    pub method: String,
    /// Optional event data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message
///
/// Exactly one of `result` and `error` is present. The infallible
/// constructors `success` and `error` guarantee this by construction;
/// `new` and deserialization reject both/neither.
///
/// # Examples
///
/// ```rust
/// use olrpc_core::{JsonRpcResponse, JsonRpcErrorData, Id};
/// use serde_json::json;
///
/// let ok = JsonRpcResponse::success(json!({"count": 3}), Id::from("r1"));
/// assert!(ok.is_success());
///
/// let both = JsonRpcResponse::new(
///     Some(json!(1)),
///     Some(JsonRpcErrorData::internal_error("x")),
///     Id::from("r2"),
/// );
/// assert!(both.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorData>,
}

impl JsonRpcResponse {
    /// Create a response, enforcing the result/error exclusivity
    ///
    /// # Errors
    ///
    /// `Error::InvalidResponse` when both or neither are supplied.
    pub fn new(result: Option<Value>, error: Option<JsonRpcErrorData>, id: Id) -> Result<Self> {
        match (&result, &error) {
            (Some(_), Some(_)) => Err(Error::InvalidResponse(
                "response cannot carry both result and error".into(),
            )),
            (None, None) => Err(Error::InvalidResponse(
                "response must carry either result or error".into(),
            )),
            _ => Ok(Self {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result,
                error,
            }),
        }
    }

    /// Create a successful response
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Build a response from a decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawResponse = serde_json::from_value(value)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Convert into a JSON value
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("jsonrpc".into(), Value::String(self.jsonrpc.clone()));
        map.insert("id".into(), self.id.to_value());
        if let Some(result) = &self.result {
            map.insert("result".into(), result.clone());
        }
        if let Some(error) = &self.error {
            map.insert(
                "error".into(),
                serde_json::to_value(error).unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }

    /// Request id this response answers
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Successful result, if any
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Error payload, if any
    pub fn error_data(&self) -> Option<&JsonRpcErrorData> {
        self.error.as_ref()
    }

    /// True when `result` is present
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    /// True when `error` is present
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Unchecked response shape, validated by `TryFrom`
#[derive(Deserialize)]
struct RawResponse {
    jsonrpc: String,
    id: Id,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorData>,
}

/// Treat a present `null` as `Some(Value::Null)` rather than absent
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawResponse> for JsonRpcResponse {
    type Error = Error;

    fn try_from(raw: RawResponse) -> Result<Self> {
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(Error::InvalidResponse(format!(
                "jsonrpc must be \"{}\"",
                JSONRPC_VERSION
            )));
        }
        Self::new(raw.result, raw.error, raw.id)
    }
}

/// Any inbound message a server can receive
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// A call expecting a response
    Request(JsonRpcRequest),
    /// A one-way message
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// True for `Request`
    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcMessage::Request(_))
    }

    /// True for `Notification`
    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Notification(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_id_display() {
        assert_eq!(Id::String("test".to_string()).to_string(), "\"test\"");
        assert_eq!(Id::Number(42).to_string(), "42");
        assert_eq!(Id::Null.to_string(), "null");
    }

    #[test]
    fn test_method_name_pattern() {
        assert!(is_valid_method_name("list_emails"));
        assert!(is_valid_method_name("tools.call"));
        assert!(is_valid_method_name("a"));
        assert!(!is_valid_method_name(""));
        assert!(!is_valid_method_name("_private"));
        assert!(!is_valid_method_name("1st"));
        assert!(!is_valid_method_name("tools/call"));
        assert!(!is_valid_method_name("get email"));
    }

    #[test]
    fn test_request_rejects_wrong_version() {
        let err = JsonRpcRequest::from_value(json!({
            "jsonrpc": "1.0", "id": "1", "method": "get_folders"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_empty_and_numeric_id() {
        for id in [json!(""), json!(7), json!(null)] {
            let result = JsonRpcRequest::from_value(json!({
                "jsonrpc": "2.0", "id": id, "method": "get_folders"
            }));
            assert!(result.is_err(), "id {id} accepted");
        }
    }

    #[test]
    fn test_request_rejects_fractional_and_oversized_id() {
        for id in [json!(1.5), json!(u64::MAX)] {
            let err = JsonRpcRequest::from_value(json!({
                "jsonrpc": "2.0", "id": id, "method": "get_folders"
            }))
            .unwrap_err();
            match err {
                Error::InvalidRequest(msg) => assert!(msg.contains(&id.to_string()), "{msg}"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_request_rejects_non_object_params() {
        let result = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0", "id": "1", "method": "get_folders", "params": [1, 2]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_missing_params_is_empty_object() {
        let req = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0", "id": "1", "method": "get_folders"
        }))
        .unwrap();
        assert!(req.params().is_empty());
    }

    #[test]
    fn test_request_round_trip() {
        let req = JsonRpcRequest::new(
            "abc",
            "search_emails",
            params(json!({"query": "invoice", "limit": 10})),
        )
        .unwrap();
        assert_eq!(JsonRpcRequest::from_value(req.to_value()).unwrap(), req);

        let text = serde_json::to_string(&req).unwrap();
        let decoded: JsonRpcRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_serde_rejects_invalid_request() {
        let result: std::result::Result<JsonRpcRequest, _> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","method":"bad name"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_requires_exactly_one_payload() {
        let both = JsonRpcResponse::new(
            Some(json!(1)),
            Some(JsonRpcErrorData::internal_error("x")),
            Id::from("1"),
        );
        assert!(matches!(both, Err(Error::InvalidResponse(_))));

        let neither = JsonRpcResponse::new(None, None, Id::from("1"));
        assert!(matches!(neither, Err(Error::InvalidResponse(_))));

        assert!(JsonRpcResponse::new(Some(json!([])), None, Id::from("1")).is_ok());
    }

    #[test]
    fn test_response_deserialization_enforces_exclusivity() {
        let both = JsonRpcResponse::from_value(json!({
            "jsonrpc": "2.0", "id": "1", "result": 1,
            "error": {"code": -32603, "message": "x"}
        }));
        assert!(both.is_err());

        let neither = JsonRpcResponse::from_value(json!({"jsonrpc": "2.0", "id": "1"}));
        assert!(neither.is_err());
    }

    #[test]
    fn test_response_round_trip() {
        let ok = JsonRpcResponse::success(json!({"folders": ["Inbox"]}), Id::from("1"));
        assert_eq!(JsonRpcResponse::from_value(ok.to_value()).unwrap(), ok);

        let null_result = JsonRpcResponse::success(Value::Null, Id::from("2"));
        assert_eq!(
            JsonRpcResponse::from_value(null_result.to_value()).unwrap(),
            null_result
        );

        let err = JsonRpcResponse::error(
            JsonRpcErrorData::with_data(-32003, "Email not found: x", json!({"severity": "medium"})),
            Id::Null,
        );
        let text = serde_json::to_string(&err).unwrap();
        let decoded: JsonRpcResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, err);
    }

    #[test]
    fn test_response_serialization_omits_absent_side() {
        let resp = JsonRpcResponse::success(json!({"status": "ok"}), Id::from("1"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }
}
