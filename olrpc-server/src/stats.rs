//! Shared error counters
//!
//! `ErrorStats` is a handle; clones share the same counters. Inject the same
//! handle into several error handlers to aggregate them, or give each its
//! own.

use olrpc_core::{ErrorKind, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorStatistics {
    pub total_errors: u64,
    /// Keyed by error kind name; only kinds seen so far
    pub errors_by_type: BTreeMap<String, u64>,
    /// Always holds every severity
    pub errors_by_severity: BTreeMap<Severity, u64>,
    pub recovery_attempts: u64,
    pub successful_recoveries: u64,
}

impl Default for ErrorStatistics {
    fn default() -> Self {
        Self {
            total_errors: 0,
            errors_by_type: BTreeMap::new(),
            errors_by_severity: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
            recovery_attempts: 0,
            successful_recoveries: 0,
        }
    }
}

impl ErrorStatistics {
    /// Count for one kind, zero when never seen
    pub fn count_for(&self, kind: ErrorKind) -> u64 {
        self.errors_by_type.get(kind.name()).copied().unwrap_or(0)
    }

    /// Count for one severity
    pub fn count_for_severity(&self, severity: Severity) -> u64 {
        self.errors_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Cloneable handle to error counters
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    inner: Arc<Mutex<ErrorStatistics>>,
}

impl ErrorStats {
    /// Fresh counters, shared with nobody yet
    pub fn new() -> Self {
        Self::default()
    }

    // Counters stay meaningful after a panic elsewhere, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ErrorStatistics> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one handled error
    pub fn record_error(&self, kind: ErrorKind, severity: Severity) {
        let mut stats = self.lock();
        stats.total_errors += 1;
        *stats.errors_by_type.entry(kind.name().to_string()).or_insert(0) += 1;
        *stats.errors_by_severity.entry(severity).or_insert(0) += 1;
    }

    /// Count one pass through recovery
    pub fn record_recovery_attempt(&self) {
        self.lock().recovery_attempts += 1;
    }

    /// Count one strategy that produced a replacement response
    pub fn record_recovery_success(&self) {
        self.lock().successful_recoveries += 1;
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> ErrorStatistics {
        self.lock().clone()
    }

    /// Zero every counter
    pub fn reset(&self) {
        *self.lock() = ErrorStatistics::default();
    }
}
