//! Assembly of the final chain for one wrapped callable

use crate::collect::{CallTarget, Collector};
use crate::middleware::{TimeoutMiddleware, TimingMiddleware};
use crate::registry::{HookRegistry, Owner};
use elif_hooks_core::{
    compose, prepare_context, CallSite, Composed, Context, ContextUpdater, HookError, HooksConfig,
    Middleware, Receiver, Terminal,
};
use serde_json::Value;
use std::sync::Arc;

/// Everything that contributes hooks to one callable.
///
/// Middleware order, outermost first: configured timing and timeout, then
/// whatever the collector resolves from the registry, then the hooks attached
/// directly to the callable.
pub(crate) struct ChainPlan<'a> {
    pub registry: &'a HookRegistry,
    pub collector: &'a dyn Collector,
    pub levels: &'a [Owner],
    pub callable: &'a Owner,
    pub middleware: &'a [Arc<dyn Middleware>],
    pub updaters: &'a [Arc<dyn ContextUpdater>],
    pub config: Option<&'a HooksConfig>,
}

impl ChainPlan<'_> {
    pub(crate) fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();

        if let Some(config) = self.config {
            if config.trace_invocations {
                chain.push(Arc::new(TimingMiddleware::new().without_fields()));
            }
            if let Some(timeout) = TimeoutMiddleware::from_hooks_config(config) {
                chain.push(Arc::new(timeout));
            }
        }

        let target = CallTarget::new(self.levels, Some(self.callable));
        chain.extend(self.collector.collect(self.registry, &target));
        chain.extend(self.middleware.iter().cloned());
        chain
    }

    /// Registry updaters of every level, then the callable's, then local ones
    pub(crate) fn updaters(&self) -> Vec<Arc<dyn ContextUpdater>> {
        self.levels
            .iter()
            .chain(std::iter::once(self.callable))
            .flat_map(|owner| self.registry.updaters_for(owner))
            .chain(self.updaters.iter().cloned())
            .collect()
    }

    pub(crate) fn compose(&self, terminal: Arc<dyn Terminal>) -> Composed {
        compose(self.middleware(), Some(terminal))
    }

    pub(crate) async fn run(
        &self,
        terminal: Arc<dyn Terminal>,
        receiver: Option<&Receiver>,
        method: &str,
        arguments: Vec<Value>,
        seed: Option<Context>,
    ) -> Result<Context, HookError> {
        let owner = self.callable.to_string();
        let context = {
            let site = CallSite::new(terminal.as_ref(), &arguments)
                .with_receiver(receiver)
                .with_method(Some(method))
                .with_owner(Some(&owner));
            prepare_context(seed, &site, &self.updaters())?
        };

        self.compose(terminal).invoke(context).await
    }
}
