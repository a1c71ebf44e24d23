//! # elif-hooks
//!
//! Attach async middleware chains to functions, objects and types.
//!
//! This crate builds on `elif-hooks-core` with:
//! - Wrapped functions and objects that compose their chain on every call
//! - An explicit registry for type-level and callable-level hooks
//! - Pluggable collection strategies for inherited hooks
//! - Built-in cache, permission, timeout, timing and recovery middleware
//! - Subscriber setup for the `elif::hooks*` log targets

// Core modules
pub mod collect;
pub mod function;
pub mod logging;
pub mod middleware;
pub mod object;
pub mod registry;

mod plan;

pub use collect::{
    collector_fn, CallTarget, CallableOnly, Collector, DefaultCollector, FnCollector,
    LevelCollector,
};
pub use function::HookedFn;
pub use logging::{init_logging, LoggingConfig};
pub use object::{HookSpec, HookedObject, Member, MethodHooks};
pub use registry::{HookRegistry, Hooks, Owner};

// Re-export the composition engine
pub use elif_hooks_core::{
    compose, method_fn, middleware_fn, prepare_context, terminal_fn, updater_fn, CallSite,
    Composed, ConfigError, Context, ContextUpdater, Defaults, DomainFailure, Environment,
    HookError, HookFuture, HooksConfig, Middleware, MiddlewareStack, NamedParams, Next,
    NoopTerminal, Props, Receiver, Terminal,
};

/// Everything needed to wrap and call functions
pub mod prelude {
    pub use crate::collect::{collector_fn, CallableOnly, Collector, DefaultCollector, LevelCollector};
    pub use crate::function::HookedFn;
    pub use crate::middleware::{
        CacheMiddleware, PermissionMiddleware, RecoverMiddleware, TimeoutMiddleware,
        TimingMiddleware,
    };
    pub use crate::object::{HookSpec, HookedObject, MethodHooks};
    pub use crate::registry::{HookRegistry, Owner};
    pub use elif_hooks_core::{
        compose, method_fn, middleware_fn, terminal_fn, updater_fn, Context, Defaults, HookError,
        HooksConfig, Middleware, MiddlewareStack, NamedParams, Next, Props, Terminal,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
