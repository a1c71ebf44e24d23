//! # Middleware
//!
//! Middleware wrap the rest of a chain with the `handle(context, next)`
//! pattern: work before `next.run()`, work after it, or skip it entirely to
//! short-circuit.

pub mod stack;

pub use stack::{compose, Composed, MiddlewareStack};

use crate::context::Context;
use crate::errors::HookError;
use stack::Chain;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Type alias for the boxed future every middleware returns
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HookError>> + Send + 'a>>;

/// Message carried by the protocol violation raised on a second `next()` call
pub const NEXT_CALLED_TWICE: &str = "next() called multiple times";

/// Next represents the rest of the middleware chain.
///
/// Clones share the same guard, so the inner chain runs at most once per
/// middleware activation no matter which clone calls [`Next::run`].
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

struct NextInner {
    chain: Arc<Chain>,
    position: usize,
    context: Context,
    called: AtomicBool,
}

impl Next {
    pub(crate) fn new(chain: Arc<Chain>, position: usize, context: Context) -> Self {
        Self {
            inner: Arc::new(NextInner {
                chain,
                position,
                context,
                called: AtomicBool::new(false),
            }),
        }
    }

    /// Run the rest of the chain.
    ///
    /// The returned future settles once every inner middleware and the
    /// terminal have finished. A second call fails with
    /// [`HookError::ProtocolViolation`] without touching the inner chain.
    pub fn run(&self) -> HookFuture<'static> {
        if self.inner.called.swap(true, Ordering::SeqCst) {
            warn!(
                target: "elif::hooks::chain",
                position = self.inner.position,
                context_id = %self.inner.context.id(),
                "{}",
                NEXT_CALLED_TWICE
            );
            return Box::pin(async { Err(HookError::protocol_violation(NEXT_CALLED_TWICE)) });
        }

        self.inner
            .chain
            .dispatch(self.inner.position, self.inner.context.clone())
    }

    /// Whether `run` has already been called
    pub fn is_called(&self) -> bool {
        self.inner.called.load(Ordering::SeqCst)
    }

    /// Whether the terminal comes right after this point
    pub fn is_terminal(&self) -> bool {
        self.inner.position >= self.inner.chain.len()
    }

    pub fn position(&self) -> usize {
        self.inner.position
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.inner.position)
            .field("called", &self.is_called())
            .finish()
    }
}

/// Middleware trait with the handle(context, next) pattern.
/// Uses boxed futures to be dyn-compatible.
pub trait Middleware: Send + Sync {
    /// Handle the invocation and optionally call the next middleware in the chain
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static>;

    /// Optional middleware name for debugging
    fn name(&self) -> &'static str {
        "Middleware"
    }
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        (**self).handle(context, next)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Closure middleware built by [`middleware_fn`]
pub struct FnMiddleware<F> {
    name: &'static str,
    handler: F,
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        Box::pin((self.handler)(context, next))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Build a middleware from an async closure
pub fn middleware_fn<F, Fut>(name: &'static str, handler: F) -> FnMiddleware<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    FnMiddleware { name, handler }
}
