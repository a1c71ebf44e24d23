//! Middleware stack and the composed callable

use super::{HookFuture, Middleware, Next};
use crate::context::Context;
use crate::errors::HookError;
use crate::terminal::{NoopTerminal, Terminal};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, Instrument};

/// Fixed chain shared by every invocation of a composed callable
pub(crate) struct Chain {
    middleware: Vec<Arc<dyn Middleware>>,
    terminal: Arc<dyn Terminal>,
}

impl Chain {
    pub(crate) fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Start the chain at `position`; past the last middleware this runs the
    /// terminal with the context arguments.
    pub(crate) fn dispatch(self: &Arc<Self>, position: usize, context: Context) -> HookFuture<'static> {
        match self.middleware.get(position) {
            Some(middleware) => {
                trace!(
                    target: "elif::hooks::chain",
                    position,
                    middleware = middleware.name(),
                    context_id = %context.id(),
                    "entering middleware"
                );
                let next = Next::new(Arc::clone(self), position + 1, context.clone());
                middleware.handle(context, next)
            }
            None => {
                let chain = Arc::clone(self);
                Box::pin(async move {
                    trace!(
                        target: "elif::hooks::chain",
                        terminal = chain.terminal.name(),
                        context_id = %context.id(),
                        "invoking terminal"
                    );
                    let arguments = context.arguments();
                    let value = chain.terminal.invoke(&context, arguments).await?;
                    context.fill_result(value);
                    Ok(())
                })
            }
        }
    }
}

/// A middleware chain fused with its terminal into one callable
#[derive(Clone)]
pub struct Composed {
    chain: Arc<Chain>,
}

impl Composed {
    /// Run the whole chain against `context` and hand the context back
    pub async fn invoke(&self, context: Context) -> Result<Context, HookError> {
        let method = context.method();
        let span = debug_span!(
            target: "elif::hooks",
            "invoke",
            context_id = %context.id(),
            method = method.as_deref().unwrap_or("<anonymous>"),
            depth = self.chain.len(),
        );

        let outcome = self
            .chain
            .dispatch(0, context.clone())
            .instrument(span)
            .await;

        match outcome {
            Ok(()) => {
                debug!(target: "elif::hooks", context_id = %context.id(), "invocation resolved");
                Ok(context)
            }
            Err(error) => {
                debug!(
                    target: "elif::hooks",
                    context_id = %context.id(),
                    error = %error,
                    "invocation rejected"
                );
                Err(error)
            }
        }
    }

    /// Call-compatible mode: resolve to `context.result`
    pub async fn call(&self, context: Context) -> Result<Option<Value>, HookError> {
        Ok(self.invoke(context).await?.result())
    }

    /// Number of middleware around the terminal
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.middleware.is_empty()
    }

    /// Middleware names from outermost to innermost
    pub fn names(&self) -> Vec<&'static str> {
        self.chain.middleware.iter().map(|m| m.name()).collect()
    }

    pub fn terminal_name(&self) -> &str {
        self.chain.terminal.name()
    }
}

impl std::fmt::Debug for Composed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composed")
            .field("middleware", &self.names())
            .field("terminal", &self.terminal_name())
            .finish()
    }
}

/// Fuse `middleware` (outermost first) and `terminal` into a callable.
///
/// A missing terminal behaves as a no-op.
pub fn compose<I>(middleware: I, terminal: Option<Arc<dyn Terminal>>) -> Composed
where
    I: IntoIterator<Item = Arc<dyn Middleware>>,
{
    Composed {
        chain: Arc::new(Chain {
            middleware: middleware.into_iter().collect(),
            terminal: terminal.unwrap_or_else(|| Arc::new(NoopTerminal)),
        }),
    }
}

/// Ordered middleware collection
#[derive(Default, Clone)]
pub struct MiddlewareStack {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Add middleware to the stack
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Add already-shared middleware
    pub fn add_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Extend this stack with another one.
    /// Middleware from this stack wrap the middleware from `other`.
    pub fn extend(mut self, other: Self) -> Self {
        self.middleware.extend(other.middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Get middleware names for debugging
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Compose the stack around `terminal`
    pub fn compose(&self, terminal: Option<Arc<dyn Terminal>>) -> Composed {
        compose(self.middleware.iter().cloned(), terminal)
    }
}

impl From<Vec<Arc<dyn Middleware>>> for MiddlewareStack {
    fn from(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middleware }
    }
}

impl IntoIterator for MiddlewareStack {
    type Item = Arc<dyn Middleware>;
    type IntoIter = std::vec::IntoIter<Arc<dyn Middleware>>;

    fn into_iter(self) -> Self::IntoIter {
        self.middleware.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{middleware_fn, NEXT_CALLED_TWICE};
    use crate::terminal::terminal_fn;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Events = Arc<Mutex<Vec<String>>>;

    /// Test middleware that records its before/after events
    struct Recorder {
        name: &'static str,
        events: Events,
    }

    impl Middleware for Recorder {
        fn handle(&self, _context: Context, next: Next) -> HookFuture<'static> {
            let name = self.name;
            let events = self.events.clone();
            Box::pin(async move {
                events.lock().push(format!("{}-before", name));
                tokio::task::yield_now().await;
                next.run().await?;
                tokio::time::sleep(Duration::from_millis(1)).await;
                events.lock().push(format!("{}-after", name));
                Ok(())
            })
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn recording_terminal(events: Events) -> Arc<dyn Terminal> {
        Arc::new(terminal_fn("T", move |_| {
            let events = events.clone();
            async move {
                events.lock().push("T".to_string());
                Ok(Some(json!("done")))
            }
        }))
    }

    #[tokio::test]
    async fn test_onion_order() {
        let events: Events = Arc::default();
        let stack = MiddlewareStack::new()
            .add(Recorder { name: "A", events: events.clone() })
            .add(Recorder { name: "B", events: events.clone() })
            .add(Recorder { name: "C", events: events.clone() });

        let composed = stack.compose(Some(recording_terminal(events.clone())));
        let result = composed.call(Context::new()).await.unwrap();

        assert_eq!(result, Some(json!("done")));
        assert_eq!(
            *events.lock(),
            vec!["A-before", "B-before", "C-before", "T", "C-after", "B-after", "A-after"]
        );
        assert_eq!(composed.names(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_chain() {
        let events: Events = Arc::default();
        let stop = middleware_fn("B", |context: Context, _next: Next| async move {
            context.set_result("cached");
            Ok(())
        });

        let stack = MiddlewareStack::new()
            .add(Recorder { name: "A", events: events.clone() })
            .add(stop)
            .add(Recorder { name: "C", events: events.clone() });

        let result = stack
            .compose(Some(recording_terminal(events.clone())))
            .call(Context::new())
            .await
            .unwrap();

        assert_eq!(result, Some(json!("cached")));
        assert_eq!(*events.lock(), vec!["A-before", "A-after"]);
    }

    #[tokio::test]
    async fn test_double_next_is_protocol_violation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let terminal: Arc<dyn Terminal> = Arc::new(terminal_fn("T", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        }));

        let twice = middleware_fn("twice", |_context: Context, next: Next| async move {
            next.run().await?;
            next.run().await
        });

        let err = compose(vec![Arc::new(twice) as Arc<dyn Middleware>], Some(terminal))
            .invoke(Context::new())
            .await
            .unwrap_err();

        assert!(err.is_protocol_violation());
        assert!(err.to_string().contains(NEXT_CALLED_TWICE));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cloned_next_shares_guard() {
        let twice = middleware_fn("clone", |_context: Context, next: Next| async move {
            let copy = next.clone();
            next.run().await?;
            assert!(copy.is_called());
            copy.run().await
        });

        let err = compose(vec![Arc::new(twice) as Arc<dyn Middleware>], None)
            .call(Context::new())
            .await
            .unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_preset_result_still_runs_terminal() {
        let events: Events = Arc::default();
        let preset = middleware_fn("preset", |context: Context, next: Next| async move {
            context.set_result("preset");
            next.run().await
        });

        let result = compose(
            vec![Arc::new(preset) as Arc<dyn Middleware>],
            Some(recording_terminal(events.clone())),
        )
        .call(Context::new())
        .await
        .unwrap();

        assert_eq!(result, Some(json!("preset")));
        assert_eq!(*events.lock(), vec!["T"]);
    }

    #[tokio::test]
    async fn test_terminal_receives_context_arguments() {
        let rewrite = middleware_fn("rewrite", |context: Context, next: Next| async move {
            context.set_argument(1, 40)?;
            next.run().await
        });
        let add = terminal_fn("add", |args: Vec<serde_json::Value>| async move {
            Ok(Some(json!(args.iter().filter_map(|v| v.as_i64()).sum::<i64>())))
        });

        let context = Context::new();
        context.set_arguments(vec![json!(2), json!(3)]).unwrap();

        let result = compose(vec![Arc::new(rewrite) as Arc<dyn Middleware>], Some(Arc::new(add)))
            .call(context)
            .await
            .unwrap();
        assert_eq!(result, Some(json!(42)));
    }

    #[tokio::test]
    async fn test_failure_propagates_unchanged() {
        let failing: Arc<dyn Terminal> =
            Arc::new(terminal_fn("T", |_| async { Err(HookError::message("boom")) }));
        let passthrough = middleware_fn("pass", |_context: Context, next: Next| async move {
            next.run().await
        });

        let err = compose(vec![Arc::new(passthrough) as Arc<dyn Middleware>], Some(failing))
            .call(Context::new())
            .await
            .unwrap_err();

        assert!(err.is_domain());
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_enclosing_middleware_recovers() {
        let failing: Arc<dyn Terminal> =
            Arc::new(terminal_fn("T", |_| async { Err(HookError::message("boom")) }));
        let recover = middleware_fn("recover", |context: Context, next: Next| async move {
            if let Err(error) = next.run().await {
                context.set_result(format!("recovered: {}", error));
            }
            Ok(())
        });

        let result = compose(vec![Arc::new(recover) as Arc<dyn Middleware>], Some(failing))
            .call(Context::new())
            .await
            .unwrap();
        assert_eq!(result, Some(json!("recovered: boom")));
    }

    #[tokio::test]
    async fn test_context_identity_across_chain() {
        let seen: Arc<Mutex<Vec<Context>>> = Arc::default();
        let make = |name: &'static str| {
            let seen = seen.clone();
            Arc::new(middleware_fn(name, move |context: Context, next: Next| {
                seen.lock().push(context.clone());
                async move { next.run().await }
            })) as Arc<dyn Middleware>
        };

        let original = Context::new();
        let returned = compose(vec![make("A"), make("B")], None)
            .invoke(original.clone())
            .await
            .unwrap();

        assert!(returned.ptr_eq(&original));
        assert_eq!(seen.lock().len(), 2);
        assert!(seen.lock().iter().all(|c| c.ptr_eq(&original)));
    }

    #[tokio::test]
    async fn test_empty_stack_runs_terminal() {
        let stack = MiddlewareStack::new();
        assert!(stack.is_empty());

        let answer: Arc<dyn Terminal> =
            Arc::new(terminal_fn("answer", |_| async { Ok(Some(json!(42))) }));
        let composed = stack.compose(Some(answer));
        assert_eq!(composed.call(Context::new()).await.unwrap(), Some(json!(42)));

        let noop = MiddlewareStack::new().compose(None);
        assert_eq!(noop.call(Context::new()).await.unwrap(), None);
        assert_eq!(noop.terminal_name(), "noop");
    }

    #[test]
    fn test_stack_info() {
        let first = middleware_fn("First", |_c: Context, n: Next| async move { n.run().await });
        let second = middleware_fn("Second", |_c: Context, n: Next| async move { n.run().await });

        let stack = MiddlewareStack::new().add(first).extend(MiddlewareStack::new().add(second));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.names(), vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_next_reports_its_position() {
        let seen: Events = Arc::default();
        let report = |label: &'static str| {
            let seen = seen.clone();
            middleware_fn(label, move |_context: Context, next: Next| {
                seen.lock()
                    .push(format!("{}:{}:{}", label, next.position(), next.is_terminal()));
                next.run()
            })
        };

        MiddlewareStack::new()
            .add(report("A"))
            .add(report("B"))
            .compose(Some(recording_terminal(Events::default())))
            .call(Context::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec!["A:1:false", "B:2:true"]);
    }
}
