//! Handler traits and types for mailbox methods
//!
//! A handler is the mail-store side of a method. The router calls it only
//! after the parameters passed validation, so it always receives the resolved
//! parameter map: supplied values normalized, omitted optional values filled
//! with their defaults.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: Wrap an async closure over the raw parameter map
//! 2. **from_typed_fn**: Wrap an async closure with serde conversion on both sides
//!
//! # Examples
//!
//! ```rust
//! use olrpc_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//!
//! let folders = from_fn(|_params| async move {
//!     Ok(serde_json::json!([{"name": "Inbox"}]))
//! });
//!
//! #[derive(Deserialize)]
//! struct GetEmail { email_id: String }
//!
//! let get_email = from_typed_fn(|params: GetEmail| async move {
//!     Ok(serde_json::json!({"id": params.email_id}))
//! });
//! ```

use olrpc_core::{Error, Params, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every handler
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// A method implementation
///
/// Errors returned here travel to the error handler unchanged, so a handler
/// should return the most specific variant it can (`Error::EmailNotFound`
/// rather than `Error::Internal`). `Error::Untyped` is reserved for failures
/// that only carry a message.
pub trait Handler: Send + Sync {
    /// Run the method with validated parameters
    fn handle(&self, params: Params) -> HandlerResult;
}

/// Adapts an async function into a [`Handler`]
pub struct AsyncHandler<F, Fut>
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    func: F,
}

impl<F, Fut> AsyncHandler<F, Fut>
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Handler for AsyncHandler<F, Fut>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn handle(&self, params: Params) -> HandlerResult {
        Box::pin((self.func)(params))
    }
}

/// Create a handler from an async function over the raw parameter map
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Box::new(AsyncHandler::new(func))
}

/// Create a handler with automatic type conversion
///
/// # Error Handling
///
/// - If params can't be deserialized to `P`: `Error::InvalidParams`
/// - If the result can't be serialized: `Error::Serialization`
/// - Function errors are passed through unchanged
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Params| {
        let func = Arc::clone(&func);
        async move {
            let params: P = serde_json::from_value(Value::Object(params))
                .map_err(|e| Error::InvalidParams(e.to_string()))?;

            let result = func(params).await?;

            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }
    })
}
