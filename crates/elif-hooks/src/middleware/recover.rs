//! # Recover Middleware
//!
//! Turns failures from the inner chain into results.

use elif_hooks_core::{Context, HookError, HookFuture, Middleware, Next};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

type Handler = Arc<dyn Fn(&HookError, &Context) -> Option<Value> + Send + Sync>;

/// Recovery middleware.
///
/// The handler returns the replacement result, or `None` to let the failure
/// continue upwards unchanged. Protocol violations are never recovered unless
/// explicitly enabled.
pub struct RecoverMiddleware {
    handler: Handler,
    recover_protocol_violations: bool,
    log_errors: bool,
}

impl RecoverMiddleware {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HookError, &Context) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            recover_protocol_violations: false,
            log_errors: true,
        }
    }

    /// Resolve every recoverable failure with the same value
    pub fn with_value(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(move |_, _| Some(value.clone()))
    }

    pub fn recover_protocol_violations(mut self, enabled: bool) -> Self {
        self.recover_protocol_violations = enabled;
        self
    }

    /// Enable error logging
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }
}

impl std::fmt::Debug for RecoverMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverMiddleware")
            .field("recover_protocol_violations", &self.recover_protocol_violations)
            .field("log_errors", &self.log_errors)
            .finish()
    }
}

impl Middleware for RecoverMiddleware {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        let handler = Arc::clone(&self.handler);
        let recover_protocol_violations = self.recover_protocol_violations;
        let log_errors = self.log_errors;

        Box::pin(async move {
            let error = match next.run().await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };

            if log_errors {
                error!(
                    target: "elif::hooks::recover",
                    context_id = %context.id(),
                    error = %error,
                    "inner chain failed"
                );
            }

            if error.is_protocol_violation() && !recover_protocol_violations {
                return Err(error);
            }

            match handler(&error, &context) {
                Some(value) => {
                    info!(target: "elif::hooks::recover", context_id = %context.id(), "recovered");
                    context.set_result(value);
                    Ok(())
                }
                None => Err(error),
            }
        })
    }

    fn name(&self) -> &'static str {
        "RecoverMiddleware"
    }
}
