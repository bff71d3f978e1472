//! Stdio mailbox server example
//!
//! Serves an in-memory mailbox over newline-delimited JSON on stdin/stdout.
//! Logs go to stderr as JSON.
//!
//! Run with: cargo run --example stdio_server
//!
//! Then type:
//! {"jsonrpc":"2.0","id":"1","method":"initialize","params":{"protocol_version":"2024-11-05"}}
//! {"jsonrpc":"2.0","id":"2","method":"list_emails","params":{"limit":2}}
//! {"jsonrpc":"2.0","id":"3","method":"get_email","params":{"email_id":"missing"}}

use olrpc::core::{Error, ObservabilityConfig, Result};
use olrpc::server::{from_typed_fn, MailboxServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
struct Email {
    id: String,
    folder: String,
    subject: String,
    sender: String,
    body: String,
}

struct Mailbox {
    emails: Vec<Email>,
}

impl Mailbox {
    fn sample() -> Self {
        let email = |id: &str, folder: &str, subject: &str, sender: &str| Email {
            id: id.into(),
            folder: folder.into(),
            subject: subject.into(),
            sender: sender.into(),
            body: format!("Body of {}", subject),
        };
        Self {
            emails: vec![
                email("m-1", "Inbox", "Quarterly invoice", "billing@example.com"),
                email("m-2", "Inbox", "Team offsite", "alice@example.com"),
                email("m-3", "Archive", "Old invoice", "billing@example.com"),
            ],
        }
    }

    fn folders(&self) -> Vec<String> {
        let mut folders: Vec<String> = self.emails.iter().map(|e| e.folder.clone()).collect();
        folders.sort();
        folders.dedup();
        folders
    }
}

#[derive(Deserialize)]
struct ListParams {
    folder: Option<String>,
    limit: usize,
}

#[derive(Deserialize)]
struct GetParams {
    email_id: String,
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    folder: Option<String>,
    limit: usize,
}

#[derive(Deserialize)]
struct NoParams {}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mailbox = Arc::new(Mailbox::sample());

    let list = Arc::clone(&mailbox);
    let get = Arc::clone(&mailbox);
    let search = Arc::clone(&mailbox);
    let folders = Arc::clone(&mailbox);

    let server = MailboxServer::builder()
        .server_name("olrpc-demo")
        .with_observability(ObservabilityConfig::new("olrpc-demo").with_log_level("debug"))
        .default_recovery_strategies()
        .handler(
            "list_emails",
            from_typed_fn(move |p: ListParams| {
                let mailbox = Arc::clone(&list);
                async move {
                    let folder = p.folder.unwrap_or_else(|| "Inbox".into());
                    if !mailbox.folders().contains(&folder) {
                        return Err(Error::FolderNotFound(folder));
                    }
                    tracing::debug!(folder = %folder, limit = p.limit, "listing emails");
                    let emails: Vec<Email> = mailbox
                        .emails
                        .iter()
                        .filter(|e| e.folder == folder)
                        .take(p.limit)
                        .cloned()
                        .collect();
                    Ok(emails)
                }
            }),
        )
        .handler(
            "get_email",
            from_typed_fn(move |p: GetParams| {
                let mailbox = Arc::clone(&get);
                async move {
                    mailbox
                        .emails
                        .iter()
                        .find(|e| e.id == p.email_id)
                        .cloned()
                        .ok_or(Error::EmailNotFound(p.email_id))
                }
            }),
        )
        .handler(
            "search_emails",
            from_typed_fn(move |p: SearchParams| {
                let mailbox = Arc::clone(&search);
                async move {
                    let needle = p.query.to_lowercase();
                    tracing::debug!(query = %p.query, "searching emails");
                    let hits: Vec<Email> = mailbox
                        .emails
                        .iter()
                        .filter(|e| p.folder.as_ref().map_or(true, |f| &e.folder == f))
                        .filter(|e| e.subject.to_lowercase().contains(&needle))
                        .take(p.limit)
                        .cloned()
                        .collect();
                    Result::Ok(hits)
                }
            }),
        )
        .handler(
            "get_folders",
            from_typed_fn(move |_: NoParams| {
                let mailbox = Arc::clone(&folders);
                async move { Result::Ok(mailbox.folders()) }
            }),
        )
        .build()?;

    tracing::info!(emails = mailbox.emails.len(), "mailbox demo serving on stdio");
    server.serve_stdio().await?;
    tracing::info!(stats = ?server.error_statistics(), "stdin closed, shutting down");
    olrpc::core::shutdown_observability();
    Ok(())
}
