//! Codec for JSON-RPC message serialization and deserialization
//!
//! Turns inbound text into validated envelopes and envelopes back into text.
//!
//! # Error Mapping
//!
//! - Text that is not JSON → `Error::Parse` (-32700)
//! - JSON that is not a single request/notification object →
//!   `Error::InvalidRequest` (-32600)
//!
//! A failed decode still reports the best id it could recover so the error
//! response can be correlated by the client; `Id::Null` otherwise.
//!
//! # Examples
//!
//! ```rust
//! use olrpc_core::{codec, JsonRpcMessage};
//!
//! let msg = codec::decode(r#"{"jsonrpc":"2.0","id":"1","method":"get_folders"}"#).unwrap();
//! assert!(msg.is_request());
//!
//! let failure = codec::decode("{not json").unwrap_err();
//! assert_eq!(failure.error.code(), Some(-32700));
//! ```

use crate::error::{Error, Result};
use crate::types::{
    Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A message that could not be decoded, with whatever id was recoverable
#[derive(Debug, Clone, Error)]
#[error("{error} (id: {id})")]
pub struct DecodeFailure {
    /// Why decoding failed
    pub error: Error,
    /// Request id, or `Id::Null` when none could be read
    pub id: Id,
}

/// Encode any serializable message to a JSON string
///
/// # Errors
///
/// Returns `Error::Serialization` if the message cannot be serialized.
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a response to JSON
pub fn encode_response(resp: &JsonRpcResponse) -> Result<String> {
    encode(resp)
}

/// Encode a request to JSON
pub fn encode_request(req: &JsonRpcRequest) -> Result<String> {
    encode(req)
}

/// Decode one inbound message
///
/// Objects carrying an `id` member are requests; objects without one are
/// notifications. Arrays (batches) are not accepted.
pub fn decode(data: &str) -> std::result::Result<JsonRpcMessage, DecodeFailure> {
    let value: Value = serde_json::from_str(data).map_err(|e| DecodeFailure {
        error: Error::Parse(e.to_string()),
        id: Id::Null,
    })?;

    let object = match value {
        Value::Object(ref map) => map,
        Value::Array(_) => {
            return Err(DecodeFailure {
                error: Error::InvalidRequest("batch requests are not supported".into()),
                id: Id::Null,
            })
        }
        _ => {
            return Err(DecodeFailure {
                error: Error::InvalidRequest("message must be a JSON object".into()),
                id: Id::Null,
            })
        }
    };

    if !object.contains_key("id") {
        return decode_notification(object).map(JsonRpcMessage::Notification);
    }

    let id = recover_id(&value);
    JsonRpcRequest::from_value(value)
        .map(JsonRpcMessage::Request)
        .map_err(|error| DecodeFailure { error, id })
}

/// Decode a message that must be a request
pub fn decode_request(data: &str) -> std::result::Result<JsonRpcRequest, DecodeFailure> {
    match decode(data)? {
        JsonRpcMessage::Request(req) => Ok(req),
        JsonRpcMessage::Notification(_) => Err(DecodeFailure {
            error: Error::InvalidRequest("missing 'id'".into()),
            id: Id::Null,
        }),
    }
}

/// Decode a response
pub fn decode_response(data: &str) -> Result<JsonRpcResponse> {
    let value: Value = serde_json::from_str(data).map_err(|e| Error::Parse(e.to_string()))?;
    JsonRpcResponse::from_value(value)
}

fn decode_notification(
    object: &serde_json::Map<String, Value>,
) -> std::result::Result<JsonRpcNotification, DecodeFailure> {
    let invalid = |msg: &str| DecodeFailure {
        error: Error::InvalidRequest(msg.to_string()),
        id: Id::Null,
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid("jsonrpc must be \"2.0\""));
    }
    let method = object
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing 'method'"))?;

    Ok(JsonRpcNotification::new(method, object.get("params").cloned()))
}

/// Best-effort id for correlating an error response
fn recover_id(value: &Value) -> Id {
    match value.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Id::String(s.clone()),
        Some(Value::Number(n)) => n.as_i64().map(Id::Number).unwrap_or(Id::Null),
        _ => Id::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorData;
    use serde_json::json;

    #[test]
    fn test_encode_decode_request() {
        let params = json!({"limit": 5}).as_object().cloned().unwrap();
        let req = JsonRpcRequest::new("r-1", "list_emails", params).unwrap();
        let encoded = encode_request(&req).unwrap();
        let decoded = decode_request(&encoded).unwrap();

        assert_eq!(decoded, req);
    }

    #[test]
    fn test_decode_notification() {
        let msg = decode(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        match msg {
            JsonRpcMessage::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_invalid_json() {
        let failure = decode("not valid json").unwrap_err();
        assert!(matches!(failure.error, Error::Parse(_)));
        assert_eq!(failure.id, Id::Null);
    }

    #[test]
    fn test_decode_empty_string() {
        let failure = decode("").unwrap_err();
        assert_eq!(failure.error.code(), Some(-32700));
    }

    #[test]
    fn test_decode_rejects_batch_and_scalars() {
        for text in ["[]", "[{\"jsonrpc\":\"2.0\"}]", "42", "\"text\""] {
            let failure = decode(text).unwrap_err();
            assert!(matches!(failure.error, Error::InvalidRequest(_)), "{text}");
        }
    }

    #[test]
    fn test_decode_invalid_request_keeps_id() {
        let failure = decode(r#"{"jsonrpc":"1.0","id":"abc","method":"get_folders"}"#).unwrap_err();
        assert!(matches!(failure.error, Error::InvalidRequest(_)));
        assert_eq!(failure.id, Id::from("abc"));

        let failure = decode(r#"{"jsonrpc":"2.0","id":7,"method":"get_folders"}"#).unwrap_err();
        assert_eq!(failure.id, Id::Number(7));
    }

    #[test]
    fn test_decode_fractional_id_is_null() {
        let failure = decode(r#"{"jsonrpc":"2.0","id":1.5,"method":"get_folders"}"#).unwrap_err();
        assert!(matches!(failure.error, Error::InvalidRequest(_)));
        assert_eq!(failure.id, Id::Null);
    }

    #[test]
    fn test_encode_decode_response_error() {
        let resp = JsonRpcResponse::error(JsonRpcErrorData::method_not_found("unknown"), Id::Null);
        let encoded = encode_response(&resp).unwrap();
        let decoded = decode_response(&encoded).unwrap();

        assert!(decoded.is_error());
        assert_eq!(decoded.id(), &Id::Null);
    }

    #[test]
    fn test_decode_response_rejects_both_payloads() {
        let text = r#"{"jsonrpc":"2.0","id":"1","result":1,"error":{"code":-1,"message":"x"}}"#;
        assert!(decode_response(text).is_err());
    }
}
