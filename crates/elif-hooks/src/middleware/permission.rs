//! # Permission Middleware
//!
//! Guards a call with a predicate over the context. Denied calls never reach
//! the wrapped function: they either resolve with a fallback result or fail
//! with `PermissionDenied`.

use elif_hooks_core::{Context, HookError, HookFuture, Middleware, Next};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

type Check = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

pub struct PermissionMiddleware {
    check: Check,
    fallback: Option<Value>,
    reason: String,
}

impl PermissionMiddleware {
    /// Allow the call when `check` returns true
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            fallback: None,
            reason: "access denied".to_string(),
        }
    }

    /// Allow the call when context field `field` equals `expected`
    pub fn require_field(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        let field = field.into();
        let expected = expected.into();
        Self::new(move |context| context.get(&field).as_ref() == Some(&expected))
            .with_reason("required role missing")
    }

    /// Resolve denied calls with `value` instead of failing
    pub fn with_fallback(mut self, value: impl Into<Value>) -> Self {
        self.fallback = Some(value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

impl std::fmt::Debug for PermissionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionMiddleware")
            .field("fallback", &self.fallback)
            .field("reason", &self.reason)
            .finish()
    }
}

impl Middleware for PermissionMiddleware {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        let allowed = (self.check)(&context);
        let fallback = self.fallback.clone();
        let reason = self.reason.clone();

        Box::pin(async move {
            if allowed {
                return next.run().await;
            }

            let method = context.method().unwrap_or_else(|| "<anonymous>".to_string());
            warn!(
                target: "elif::hooks::permission",
                method = %method,
                context_id = %context.id(),
                reason = %reason,
                "call denied"
            );

            match fallback {
                Some(value) => {
                    context.set_result(value);
                    Ok(())
                }
                None => Err(HookError::permission_denied(method, reason)),
            }
        })
    }

    fn name(&self) -> &'static str {
        "PermissionMiddleware"
    }
}
