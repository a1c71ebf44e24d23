//! # Wrapped functions
//!
//! `HookedFn` attaches middleware and context updaters to a function without
//! touching the function itself.
//!
//! ```rust,no_run
//! use elif_hooks::prelude::*;
//! use serde_json::{json, Value};
//!
//! # async fn demo() -> Result<(), HookError> {
//! let add = HookedFn::new("add", terminal_fn("add", |args: Vec<Value>| async move {
//!     Ok(Some(json!(args.iter().filter_map(Value::as_i64).sum::<i64>())))
//! }))
//! .with_params(["a", "b"])?
//! .with_middleware(middleware_fn("double", |context: Context, next: Next| async move {
//!     next.run().await?;
//!     let sum = context.result().and_then(|v| v.as_i64()).unwrap_or(0);
//!     context.set_result(sum * 2);
//!     Ok(())
//! }));
//!
//! assert_eq!(add.call(vec![json!(1), json!(2)]).await?, Some(json!(6)));
//! # Ok(())
//! # }
//! ```

use crate::collect::{Collector, DefaultCollector};
use crate::plan::ChainPlan;
use crate::registry::{HookRegistry, Owner};
use elif_hooks_core::{
    Composed, Context, ContextUpdater, Defaults, HookError, HooksConfig, Middleware,
    MiddlewareStack, NamedParams, NoopTerminal, Props, Receiver, Terminal,
};
use serde_json::Value;
use std::sync::Arc;

/// A function wrapped in a middleware chain
#[derive(Clone)]
pub struct HookedFn {
    name: String,
    owner: Owner,
    terminal: Arc<dyn Terminal>,
    middleware: Vec<Arc<dyn Middleware>>,
    updaters: Vec<Arc<dyn ContextUpdater>>,
    registry: HookRegistry,
    levels: Vec<Owner>,
    collector: Arc<dyn Collector>,
    receiver: Option<Receiver>,
    config: Option<HooksConfig>,
}

impl HookedFn {
    /// Wrap `terminal` under the function name `name`
    pub fn new<T: Terminal + 'static>(name: impl Into<String>, terminal: T) -> Self {
        Self::from_arc(name, Arc::new(terminal))
    }

    pub fn from_arc(name: impl Into<String>, terminal: Arc<dyn Terminal>) -> Self {
        let name = name.into();
        Self {
            owner: Owner::function(name.clone()),
            name,
            terminal,
            middleware: Vec::new(),
            updaters: Vec::new(),
            registry: HookRegistry::new(),
            levels: Vec::new(),
            collector: Arc::new(DefaultCollector),
            receiver: None,
            config: None,
        }
    }

    /// A wrapper with nothing inside; the middleware decide the result
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, NoopTerminal)
    }

    /// Add a middleware inside the ones already attached
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn with_middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn with_stack(mut self, stack: MiddlewareStack) -> Self {
        self.middleware.extend(stack);
        self
    }

    pub fn with_updater<U: ContextUpdater + 'static>(mut self, updater: U) -> Self {
        self.updaters.push(Arc::new(updater));
        self
    }

    /// Name the positional parameters; arguments become read-only
    pub fn with_params<I, S>(self, names: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.with_updater(NamedParams::new(names)?))
    }

    pub fn with_defaults(self, defaults: Defaults) -> Self {
        self.with_updater(defaults)
    }

    pub fn with_props(self, props: Props) -> Self {
        self.with_updater(props)
    }

    /// Pull additional hooks from `registry`
    pub fn with_registry(mut self, registry: HookRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Type-level owners whose hooks wrap this function, outermost first
    pub fn with_levels(mut self, levels: Vec<Owner>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_collector<C: Collector + 'static>(mut self, collector: C) -> Self {
        self.collector = Arc::new(collector);
        self
    }

    /// Bind a receiver, making this a bound method
    pub fn with_receiver(mut self, receiver: Receiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Apply configured timeout and invocation tracing
    pub fn with_config(mut self, config: &HooksConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    fn plan(&self) -> ChainPlan<'_> {
        ChainPlan {
            registry: &self.registry,
            collector: self.collector.as_ref(),
            levels: &self.levels,
            callable: &self.owner,
            middleware: &self.middleware,
            updaters: &self.updaters,
            config: self.config.as_ref(),
        }
    }

    /// Compose the chain as it stands in the registry right now
    pub fn compose(&self) -> Composed {
        self.plan().compose(Arc::clone(&self.terminal))
    }

    /// Call and resolve to the final context
    pub async fn invoke(&self, arguments: Vec<Value>) -> Result<Context, HookError> {
        self.run(arguments, None).await
    }

    /// Call and resolve to the result
    pub async fn call(&self, arguments: Vec<Value>) -> Result<Option<Value>, HookError> {
        Ok(self.run(arguments, None).await?.result())
    }

    /// Call with a caller-built context, which is the one every middleware sees
    pub async fn call_with_context(
        &self,
        arguments: Vec<Value>,
        context: Context,
    ) -> Result<Context, HookError> {
        self.run(arguments, Some(context)).await
    }

    async fn run(&self, arguments: Vec<Value>, seed: Option<Context>) -> Result<Context, HookError> {
        self.plan()
            .run(
                Arc::clone(&self.terminal),
                self.receiver.as_ref(),
                &self.name,
                arguments,
                seed,
            )
            .await
    }
}

impl std::fmt::Debug for HookedFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookedFn")
            .field("name", &self.name)
            .field("middleware", &self.compose().names())
            .field("collector", &self.collector.name())
            .finish()
    }
}
