//! # Timing Middleware
//!
//! Invocation timing for performance monitoring.

use chrono::Utc;
use elif_hooks_core::{Context, HookFuture, Middleware, Next};
use std::time::Instant;
use tracing::{debug, warn};

/// Context field holding the invocation duration in milliseconds
pub const ELAPSED_FIELD: &str = "elapsed_ms";
/// Context field holding the RFC 3339 start timestamp
pub const STARTED_AT_FIELD: &str = "started_at";

/// Invocation timing middleware that records duration on the context
#[derive(Debug)]
pub struct TimingMiddleware {
    /// Whether to store timing fields on the context
    record_fields: bool,
    /// Warning threshold in milliseconds for slow invocations
    slow_threshold_ms: u64,
}

impl TimingMiddleware {
    /// Create new timing middleware with default settings
    pub fn new() -> Self {
        Self {
            record_fields: true,
            slow_threshold_ms: 1000,
        }
    }

    /// Only log, leave the context untouched
    pub fn without_fields(mut self) -> Self {
        self.record_fields = false;
        self
    }

    /// Set slow invocation warning threshold in milliseconds
    pub fn with_slow_threshold(mut self, threshold_ms: u64) -> Self {
        self.slow_threshold_ms = threshold_ms;
        self
    }
}

impl Default for TimingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for TimingMiddleware {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        let record_fields = self.record_fields;
        let slow_threshold = self.slow_threshold_ms;

        Box::pin(async move {
            let start = Instant::now();
            let method = context.method().unwrap_or_else(|| "<anonymous>".to_string());
            if record_fields {
                context.set(STARTED_AT_FIELD, Utc::now().to_rfc3339());
            }

            debug!(target: "elif::hooks::timing", method = %method, "invocation started");

            let outcome = next.run().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            if record_fields {
                context.set(ELAPSED_FIELD, duration_ms);
            }

            if duration_ms > slow_threshold {
                warn!(
                    target: "elif::hooks::timing",
                    method = %method,
                    duration_ms,
                    "slow invocation"
                );
            } else {
                debug!(
                    target: "elif::hooks::timing",
                    method = %method,
                    duration_ms,
                    ok = outcome.is_ok(),
                    "invocation finished"
                );
            }

            outcome
        })
    }

    fn name(&self) -> &'static str {
        "TimingMiddleware"
    }
}
