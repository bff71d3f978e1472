//! Severity classification for errors
//!
//! Every [`ErrorKind`] maps to exactly one [`Severity`]. The mapping is static
//! and drives the log level used when an error is handled:
//!
//! | Severity | Kinds | Log level |
//! |---|---|---|
//! | Low | parse, request shape, parameters, validation | info |
//! | Medium | lookups that found nothing, anything unclassified | warn |
//! | High | permission refused, timeouts | error |
//! | Critical | lost connection to the mail store | error (`critical = true`) |

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-level error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities from least to most severe
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Classify an error kind
    ///
    /// Kinds without an explicit entry are `Medium`.
    pub fn classify(kind: ErrorKind) -> Severity {
        match kind {
            ErrorKind::Parse
            | ErrorKind::InvalidRequest
            | ErrorKind::InvalidResponse
            | ErrorKind::SessionInactive
            | ErrorKind::MethodNotFound
            | ErrorKind::InvalidParams
            | ErrorKind::Validation => Severity::Low,
            ErrorKind::EmailNotFound | ErrorKind::FolderNotFound => Severity::Medium,
            ErrorKind::PermissionDenied | ErrorKind::Timeout => Severity::High,
            ErrorKind::ConnectionLost => Severity::Critical,
            _ => Severity::Medium,
        }
    }

    /// Lowercase name used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Whether handling should capture a backtrace
    pub fn wants_backtrace(self) -> bool {
        self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
