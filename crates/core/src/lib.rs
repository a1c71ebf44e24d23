//! # elif-hooks-core
//!
//! Middleware composition engine: an ordered chain of async middleware wrapped
//! around a terminal operation, sharing one mutable context per invocation.

pub mod config;
pub mod context;
pub mod errors;
pub mod middleware;
pub mod terminal;
pub mod updater;

pub use config::{ConfigError, Environment, HooksConfig};
pub use context::{Context, Receiver};
pub use errors::{DomainFailure, HookError};
pub use middleware::{
    compose, middleware_fn, Composed, FnMiddleware, HookFuture, Middleware, MiddlewareStack, Next,
};
pub use terminal::{method_fn, terminal_fn, NoopTerminal, Terminal};
pub use updater::{
    prepare_context, updater_fn, CallSite, ContextUpdater, Defaults, NamedParams, Props,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
