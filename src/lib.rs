//! olrpc - JSON-RPC 2.0 request lifecycle for mailbox operations
//!
//! This is the convenience crate that re-exports the olrpc sub-crates.
//!
//! # Architecture
//!
//! - **olrpc-core**: Envelopes, codec, error taxonomy, severity, observability
//! - **olrpc-server**: Session, schema catalog, validation, routing, error
//!   handling and the stdio transport
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use olrpc::MailboxServer;
//! use olrpc::server::from_fn;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = MailboxServer::builder()
//!         .handler("get_folders", from_fn(|_| async {
//!             Ok(serde_json::json!([{"name": "Inbox"}]))
//!         }))
//!         .build()?;
//!
//!     server.serve_stdio().await?;
//!     Ok(())
//! }
//! ```

pub use olrpc_core as core;
pub use olrpc_server as server;

pub use olrpc_core::{Error, ErrorKind, Result, Severity};
pub use olrpc_server::{MailboxServer, SchemaCatalog, ServerBuilder};
