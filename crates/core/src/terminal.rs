//! # Terminal
//!
//! The wrapped operation sitting at the bottom of a middleware chain.

use crate::context::Context;
use crate::errors::HookError;
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Operation invoked once every middleware has proceeded.
///
/// Returning `Ok(None)` leaves the context result undefined.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn invoke(
        &self,
        context: &Context,
        arguments: Vec<Value>,
    ) -> Result<Option<Value>, HookError>;

    /// Optional terminal name for debugging
    fn name(&self) -> &str {
        "terminal"
    }
}

/// Terminal used when nothing is wrapped
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTerminal;

#[async_trait]
impl Terminal for NoopTerminal {
    async fn invoke(&self, _: &Context, _: Vec<Value>) -> Result<Option<Value>, HookError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Plain function terminal built by [`terminal_fn`]
pub struct FnTerminal<F> {
    name: String,
    handler: F,
}

#[async_trait]
impl<F, Fut> Terminal for FnTerminal<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, HookError>> + Send + 'static,
{
    async fn invoke(&self, _: &Context, arguments: Vec<Value>) -> Result<Option<Value>, HookError> {
        (self.handler)(arguments).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap an async function of the call arguments as a terminal
pub fn terminal_fn<F, Fut>(name: impl Into<String>, handler: F) -> FnTerminal<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, HookError>> + Send + 'static,
{
    FnTerminal {
        name: name.into(),
        handler,
    }
}

/// Method terminal built by [`method_fn`]; receives the typed receiver
pub struct MethodTerminal<T, F> {
    name: String,
    handler: F,
    _receiver: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T, F, Fut> Terminal for MethodTerminal<T, F>
where
    T: Any + Send + Sync,
    F: Fn(Arc<T>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, HookError>> + Send + 'static,
{
    async fn invoke(
        &self,
        context: &Context,
        arguments: Vec<Value>,
    ) -> Result<Option<Value>, HookError> {
        let receiver = context.receiver_as::<T>().ok_or_else(|| {
            HookError::configuration(format!(
                "method '{}' requires a receiver of type {}",
                self.name,
                std::any::type_name::<T>()
            ))
        })?;
        (self.handler)(receiver, arguments).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap an async method of `T` as a terminal
pub fn method_fn<T, F, Fut>(name: impl Into<String>, handler: F) -> MethodTerminal<T, F>
where
    T: Any + Send + Sync,
    F: Fn(Arc<T>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, HookError>> + Send + 'static,
{
    MethodTerminal {
        name: name.into(),
        handler,
        _receiver: PhantomData,
    }
}
