//! Recovery strategies consulted by the error handler
//!
//! A strategy either produces a replacement response (`Ok(Some(..))`),
//! declines (`Ok(None)`), or fails (`Err(..)`). The handler treats a failure
//! or a panic the same as declining. The strategies shipped here never
//! produce a response: they compute retry advice from the context's attempt
//! counter and log it, leaving the retry itself to the caller.

use crate::context::ErrorContext;
use olrpc_core::{Error, JsonRpcResponse, Result};
use std::time::Duration;

/// A recovery attempt for one error kind
pub trait RecoveryStrategy: Send + Sync {
    fn recover(&self, error: &Error, ctx: &ErrorContext) -> Result<Option<JsonRpcResponse>>;
}

impl<F> RecoveryStrategy for F
where
    F: Fn(&Error, &ErrorContext) -> Result<Option<JsonRpcResponse>> + Send + Sync,
{
    fn recover(&self, error: &Error, ctx: &ErrorContext) -> Result<Option<JsonRpcResponse>> {
        self(error, ctx)
    }
}

/// Advice for a lost mail-store connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRetry {
    pub max_attempts: u32,
}

impl Default for ConnectionRetry {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RecoveryStrategy for ConnectionRetry {
    fn recover(&self, error: &Error, ctx: &ErrorContext) -> Result<Option<JsonRpcResponse>> {
        if ctx.attempt >= self.max_attempts {
            tracing::warn!(
                method = %ctx.method,
                attempt = ctx.attempt,
                max_attempts = self.max_attempts,
                "connection retries exhausted"
            );
            return Ok(None);
        }
        tracing::info!(
            method = %ctx.method,
            attempt = ctx.attempt,
            error = %error,
            "connection lost; reconnect and retry"
        );
        Ok(None)
    }
}

/// Advice for a mail-store timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutRetry {
    pub max_attempts: u32,
}

impl Default for TimeoutRetry {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RecoveryStrategy for TimeoutRetry {
    fn recover(&self, error: &Error, ctx: &ErrorContext) -> Result<Option<JsonRpcResponse>> {
        if ctx.attempt >= self.max_attempts {
            tracing::warn!(method = %ctx.method, attempt = ctx.attempt, "timeout retries exhausted");
            return Ok(None);
        }
        tracing::info!(
            method = %ctx.method,
            attempt = ctx.attempt,
            error = %error,
            "operation timed out; retry may succeed"
        );
        Ok(None)
    }
}

/// Capped exponential backoff advice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ExponentialBackoff {
    /// `base_delay * 2^attempt`, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl RecoveryStrategy for ExponentialBackoff {
    fn recover(&self, error: &Error, ctx: &ErrorContext) -> Result<Option<JsonRpcResponse>> {
        if ctx.attempt >= self.max_attempts {
            tracing::warn!(method = %ctx.method, attempt = ctx.attempt, "backoff attempts exhausted");
            return Ok(None);
        }
        let delay = self.delay_for(ctx.attempt);
        tracing::info!(
            method = %ctx.method,
            attempt = ctx.attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retry after backoff"
        );
        Ok(None)
    }
}
