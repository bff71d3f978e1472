//! Router for mailbox methods
//!
//! The router owns the method table and the schema catalog the validator
//! reads. Routing a call looks up the handler, validates and resolves the
//! parameters against the method's schema, then runs the handler.
//!
//! # Thread Safety
//!
//! Routers are cheaply cloneable (`Arc`-based). Registration uses
//! copy-on-write, so a router is effectively immutable once shared.
//!
//! # Examples
//!
//! ```rust
//! use olrpc_server::{Router, from_fn};
//!
//! let mut router = Router::mailbox();
//! router
//!     .register_handler("get_folders", from_fn(|_| async {
//!         Ok(serde_json::json!([{"name": "Inbox"}]))
//!     }))
//!     .unwrap();
//! assert!(router.has_method("get_folders"));
//! ```

use crate::handler::Handler;
use crate::schema::{MethodSchema, SchemaCatalog};
use crate::validator;
use olrpc_core::{Error, JsonRpcRequest, Params, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps method names to handlers and validates their parameters
#[derive(Clone)]
pub struct Router {
    handlers: Arc<HashMap<String, Arc<dyn Handler>>>,
    catalog: Arc<SchemaCatalog>,
}

impl Router {
    /// Create an empty router with an empty catalog
    pub fn new() -> Self {
        Self::with_catalog(SchemaCatalog::new())
    }

    /// Create a router whose parameters are validated against `catalog`
    pub fn with_catalog(catalog: SchemaCatalog) -> Self {
        Self {
            handlers: Arc::new(HashMap::new()),
            catalog: Arc::new(catalog),
        }
    }

    /// Create a router over the mailbox catalog, with no handlers yet
    pub fn mailbox() -> Self {
        Self::with_catalog(SchemaCatalog::mailbox())
    }

    /// Register a handler, replacing any previous one for the method
    ///
    /// # Errors
    ///
    /// `Error::InvalidRequest` when `method` is empty.
    pub fn register_handler(&mut self, method: impl Into<String>, handler: Box<dyn Handler>) -> Result<()> {
        let method = method.into();
        if method.trim().is_empty() {
            return Err(Error::InvalidRequest("Method name cannot be empty".into()));
        }
        if !self.catalog.iter().any(|m| m.name == method) {
            tracing::debug!(method = %method, "handler registered without a schema");
        }
        let handlers = Arc::make_mut(&mut self.handlers);
        if handlers.insert(method.clone(), Arc::from(handler)).is_some() {
            tracing::debug!(method = %method, "handler replaced");
        }
        Ok(())
    }

    /// Register a schema and its handler together
    pub fn register_method(&mut self, schema: MethodSchema, handler: Box<dyn Handler>) -> Result<()> {
        let method = schema.name.clone();
        Arc::make_mut(&mut self.catalog).insert(schema);
        self.register_handler(method, handler)
    }

    /// Remove a handler; its schema stays in the catalog
    pub fn unregister(&mut self, method: &str) -> bool {
        Arc::make_mut(&mut self.handlers).remove(method).is_some()
    }

    /// Get a handler for a method
    pub fn get(&self, method: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(method).cloned()
    }

    /// Check if a method has a handler
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().cloned().collect();
        methods.sort_unstable();
        methods
    }

    /// The schema declared for a method
    pub fn schema(&self, method: &str) -> Option<&MethodSchema> {
        self.catalog.get(method)
    }

    /// The catalog parameters are validated against
    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// Validate and resolve parameters for a method
    ///
    /// Methods without a schema accept their parameters unchanged.
    pub fn validate_params(&self, method: &str, params: &Params) -> Result<Params> {
        match self.catalog.get(method) {
            Some(schema) => validator::validate_params(schema, params),
            None => Ok(params.clone()),
        }
    }

    /// Route a request envelope
    pub async fn route_request(&self, request: &JsonRpcRequest) -> Result<Value> {
        self.route(request.method(), request.params()).await
    }

    /// Route a method call to its handler
    ///
    /// # Errors
    ///
    /// - `Error::MethodNotFound` listing the registered methods
    /// - `Error::Validation` when the parameters fail their schema
    /// - whatever the handler returns, unchanged
    pub async fn route(&self, method: &str, params: &Params) -> Result<Value> {
        let handler = self.get(method).ok_or_else(|| Error::MethodNotFound {
            method: method.to_string(),
            available: self.methods(),
        })?;

        let validated = self.validate_params(method, params)?;
        tracing::debug!(method = %method, "dispatching to handler");
        handler.handle(validated).await
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a router
pub struct RouterBuilder {
    router: Router,
    error: Option<Error>,
}

impl RouterBuilder {
    /// Start from an empty catalog
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            error: None,
        }
    }

    /// Start from `catalog`
    pub fn with_catalog(catalog: SchemaCatalog) -> Self {
        Self {
            router: Router::with_catalog(catalog),
            error: None,
        }
    }

    /// Add a handler for a method
    pub fn handler(mut self, method: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        if let Err(e) = self.router.register_handler(method, handler) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Add a schema and its handler
    pub fn method(mut self, schema: MethodSchema, handler: Box<dyn Handler>) -> Self {
        if let Err(e) = self.router.register_method(schema, handler) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Build the router, reporting the first registration failure
    pub fn build(self) -> Result<Router> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.router),
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use crate::schema::ParamSpec;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn echo() -> Box<dyn Handler> {
        from_fn(|p: Params| async move { Ok(Value::Object(p)) })
    }

    #[tokio::test]
    async fn test_router_basic() {
        let mut router = Router::mailbox();
        router
            .register_handler("get_folders", from_fn(|_| async { Ok(json!(["Inbox"])) }))
            .unwrap();

        assert!(router.has_method("get_folders"));
        assert!(!router.has_method("list_emails"));

        let result = router.route("get_folders", &Params::new()).await.unwrap();
        assert_eq!(result, json!(["Inbox"]));
    }

    #[tokio::test]
    async fn test_method_not_found_lists_available() {
        let router = RouterBuilder::with_catalog(SchemaCatalog::mailbox())
            .handler("list_emails", echo())
            .handler("get_email", echo())
            .build()
            .unwrap();

        let err = router.route("delete_email", &Params::new()).await.unwrap_err();
        match err {
            Error::MethodNotFound { method, available } => {
                assert_eq!(method, "delete_email");
                assert_eq!(available, vec!["get_email", "list_emails"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_email_id_is_reported() {
        let router = RouterBuilder::with_catalog(SchemaCatalog::mailbox())
            .handler("get_email", echo())
            .build()
            .unwrap();

        let err = router.route("get_email", &Params::new()).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("email_id"));
    }

    #[tokio::test]
    async fn test_limit_above_maximum() {
        let router = RouterBuilder::with_catalog(SchemaCatalog::mailbox())
            .handler("list_emails", echo())
            .build()
            .unwrap();

        let err = router
            .route("list_emails", &params(json!({"limit": 5000})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1000"));
    }

    #[tokio::test]
    async fn test_handler_receives_resolved_params() {
        let router = RouterBuilder::with_catalog(SchemaCatalog::mailbox())
            .handler("search_emails", echo())
            .build()
            .unwrap();

        let result = router
            .route("search_emails", &params(json!({"query": "  budget "})))
            .await
            .unwrap();
        assert_eq!(result, json!({"query": "budget", "limit": 50}));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate_unchanged() {
        let router = RouterBuilder::with_catalog(SchemaCatalog::mailbox())
            .handler(
                "get_email",
                from_fn(|_| async { Err(Error::PermissionDenied("mailbox locked".into())) }),
            )
            .build()
            .unwrap();

        let err = router
            .route("get_email", &params(json!({"email_id": "m1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(ref m) if m == "mailbox locked"));
    }

    #[tokio::test]
    async fn test_register_method_adds_schema() {
        let mut router = Router::new();
        router
            .register_method(
                MethodSchema::new("mark_read", "Mark a message as read")
                    .param(ParamSpec::integer("count", "How many", 1, 10)),
                echo(),
            )
            .unwrap();

        assert!(router.schema("mark_read").is_some());
        assert!(router.route("mark_read", &params(json!({"count": 11}))).await.is_err());
        assert!(router.route("mark_read", &params(json!({"count": 3}))).await.is_ok());
    }

    #[test]
    fn test_empty_method_name_rejected() {
        let mut router = Router::new();
        assert!(router.register_handler("", echo()).is_err());
        assert!(RouterBuilder::new().handler("  ", echo()).build().is_err());
    }

    #[test]
    fn test_overwrite_and_unregister() {
        let mut router = Router::mailbox();
        router.register_handler("get_folders", echo()).unwrap();
        router.register_handler("get_folders", echo()).unwrap();
        assert_eq!(router.methods(), vec!["get_folders"]);

        assert!(router.unregister("get_folders"));
        assert!(!router.unregister("get_folders"));
        assert!(router.schema("get_folders").is_some());
    }

    #[test]
    fn test_validate_params_without_schema_passes_through() {
        let router = Router::new();
        let p = params(json!({"anything": 1}));
        assert_eq!(router.validate_params("custom", &p).unwrap(), p);
    }
}
