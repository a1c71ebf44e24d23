//! # Collectors
//!
//! A collector decides which middleware apply to a call. The default strategy
//! concatenates type-level hooks and then callable-level hooks, so type hooks
//! run outermost.

use crate::registry::{HookRegistry, Owner};
use elif_hooks_core::Middleware;
use std::sync::Arc;

/// What a collector resolves middleware for
#[derive(Debug, Clone, Copy)]
pub struct CallTarget<'a> {
    /// Type-level owners, outermost first
    pub levels: &'a [Owner],
    /// The callable itself (function or method owner)
    pub callable: Option<&'a Owner>,
}

impl<'a> CallTarget<'a> {
    pub fn new(levels: &'a [Owner], callable: Option<&'a Owner>) -> Self {
        Self { levels, callable }
    }
}

/// Strategy resolving the ordered middleware sequence of a call
pub trait Collector: Send + Sync {
    fn collect(&self, registry: &HookRegistry, target: &CallTarget<'_>) -> Vec<Arc<dyn Middleware>>;

    fn name(&self) -> &'static str {
        "Collector"
    }
}

/// Type-level hooks of every level in order, then callable hooks
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCollector;

impl Collector for DefaultCollector {
    fn collect(&self, registry: &HookRegistry, target: &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> {
        target
            .levels
            .iter()
            .chain(target.callable)
            .flat_map(|owner| registry.middleware_for(owner))
            .collect()
    }

    fn name(&self) -> &'static str {
        "DefaultCollector"
    }
}

/// Uses an explicit list of levels in place of the call's own.
///
/// This is how hooks of a base type reach a derived one: list the base level
/// first and the derived level after it.
#[derive(Debug, Clone)]
pub struct LevelCollector {
    levels: Vec<Owner>,
}

impl LevelCollector {
    pub fn new(levels: Vec<Owner>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[Owner] {
        &self.levels
    }
}

impl Collector for LevelCollector {
    fn collect(&self, registry: &HookRegistry, target: &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> {
        DefaultCollector.collect(registry, &CallTarget::new(&self.levels, target.callable))
    }

    fn name(&self) -> &'static str {
        "LevelCollector"
    }
}

/// Only the callable's own hooks; type-level hooks are ignored
#[derive(Debug, Default, Clone, Copy)]
pub struct CallableOnly;

impl Collector for CallableOnly {
    fn collect(&self, registry: &HookRegistry, target: &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> {
        target
            .callable
            .map(|owner| registry.middleware_for(owner))
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "CallableOnly"
    }
}

/// Closure collector built by [`collector_fn`]
pub struct FnCollector<F> {
    name: &'static str,
    handler: F,
}

impl<F> Collector for FnCollector<F>
where
    F: Fn(&HookRegistry, &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> + Send + Sync,
{
    fn collect(&self, registry: &HookRegistry, target: &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> {
        (self.handler)(registry, target)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

pub fn collector_fn<F>(name: &'static str, handler: F) -> FnCollector<F>
where
    F: Fn(&HookRegistry, &CallTarget<'_>) -> Vec<Arc<dyn Middleware>> + Send + Sync,
{
    FnCollector { name, handler }
}
