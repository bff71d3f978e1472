//! Per-failure context handed to the error handler

use chrono::{DateTime, Utc};
use olrpc_core::{Id, JsonRpcRequest, Params};
use serde::Serialize;
use serde_json::{Map, Value};

/// Where and when a failure happened
///
/// Built once with the consuming `with_*` methods, then only borrowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorContext {
    pub request_id: Id,
    pub method: String,
    pub parameters: Params,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<Map<String, Value>>,
    /// Zero-based retry counter, read by recovery strategies
    pub attempt: u32,
}

impl ErrorContext {
    /// Context stamped with the current time and no parameters
    pub fn new(request_id: impl Into<Id>, method: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            parameters: Params::new(),
            timestamp: Utc::now(),
            user_agent: None,
            client_info: None,
            attempt: 0,
        }
    }

    /// Context for a failed request
    pub fn from_request(request: &JsonRpcRequest) -> Self {
        Self::new(request.id().clone(), request.method()).with_parameters(request.params().clone())
    }

    pub fn with_parameters(mut self, parameters: Params) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_client_info(mut self, client_info: Map<String, Value>) -> Self {
        self.client_info = Some(client_info);
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_request_copies_envelope_fields() {
        let params = json!({"email_id": "m-1"}).as_object().cloned().unwrap();
        let request = JsonRpcRequest::new("r-9", "get_email", params.clone()).unwrap();

        let ctx = ErrorContext::from_request(&request).with_attempt(2);
        assert_eq!(ctx.request_id, Id::from("r-9"));
        assert_eq!(ctx.method, "get_email");
        assert_eq!(ctx.parameters, params);
        assert_eq!(ctx.attempt, 2);
        assert!(!ctx.parameters.contains_key("attempt"));
    }

    #[test]
    fn test_serialized_form_skips_absent_fields() {
        let ctx = ErrorContext::new("r-1", "get_folders").with_user_agent("cli/1.0");
        let value = serde_json::to_value(&ctx).unwrap();

        assert_eq!(value["user_agent"], "cli/1.0");
        assert!(value.get("client_info").is_none());
        assert_eq!(value["attempt"], 0);
    }
}
