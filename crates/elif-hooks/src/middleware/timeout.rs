//! # Timeout Middleware
//!
//! Races the rest of the chain against a timer. On expiry the caller stops
//! waiting; the inner chain keeps running on the runtime until it settles.

use elif_hooks_core::{Context, HookError, HookFuture, HooksConfig, Middleware, Next};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{warn, Instrument};

/// Configuration for timeout middleware
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Invocation timeout duration
    pub timeout: Duration,
    /// Whether to log timeout events
    pub log_timeouts: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            log_timeouts: true,
        }
    }
}

impl TimeoutConfig {
    /// Create new timeout configuration
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Enable or disable timeout logging
    pub fn with_logging(mut self, log_timeouts: bool) -> Self {
        self.log_timeouts = log_timeouts;
        self
    }
}

/// Timeout middleware for wrapped calls
#[derive(Debug, Default)]
pub struct TimeoutMiddleware {
    config: TimeoutConfig,
}

impl TimeoutMiddleware {
    /// Create timeout middleware with specific duration
    pub fn with_duration(timeout: Duration) -> Self {
        Self {
            config: TimeoutConfig::new(timeout),
        }
    }

    /// Create timeout middleware with custom configuration
    pub fn with_config(config: TimeoutConfig) -> Self {
        Self { config }
    }

    /// Build from the hooks configuration, if it sets a default timeout
    pub fn from_hooks_config(config: &HooksConfig) -> Option<Self> {
        config.default_timeout.map(Self::with_duration)
    }

    /// Enable or disable logging (builder pattern)
    pub fn logging(mut self, enabled: bool) -> Self {
        self.config = self.config.with_logging(enabled);
        self
    }

    /// Get timeout duration
    pub fn duration(&self) -> Duration {
        self.config.timeout
    }
}

impl Middleware for TimeoutMiddleware {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        let after = self.config.timeout;
        let log_timeouts = self.config.log_timeouts;

        Box::pin(async move {
            // detached so an abandoned chain still runs to completion
            let inner = tokio::spawn(next.run().in_current_span());

            match timeout(after, inner).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => {
                    if join_error.is_panic() {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                    Err(HookError::domain(join_error))
                }
                Err(_) => {
                    if log_timeouts {
                        let method = context.method();
                        warn!(
                            target: "elif::hooks::timeout",
                            method = method.as_deref().unwrap_or("<anonymous>"),
                            context_id = %context.id(),
                            "Invocation timed out after {:?}",
                            after
                        );
                    }
                    Err(HookError::Timeout { after })
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "TimeoutMiddleware"
    }
}
