//! # Hooked objects
//!
//! A `HookedObject` pairs a receiver with its named members. Methods can be
//! hooked individually; calls go through the composed chain with the
//! receiver bound on the context.

use crate::collect::{Collector, DefaultCollector};
use crate::plan::ChainPlan;
use crate::registry::{HookRegistry, Owner};
use elif_hooks_core::{
    Composed, Context, ContextUpdater, HookError, HooksConfig, Middleware, MiddlewareStack,
    Receiver, Terminal,
};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A named member of a hooked object
#[derive(Clone)]
pub enum Member {
    Method(Arc<dyn Terminal>),
    /// Plain data; cannot be hooked or called
    Value(Value),
}

impl Member {
    pub fn is_callable(&self) -> bool {
        matches!(self, Member::Method(_))
    }
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Method(terminal) => write!(f, "Method({})", terminal.name()),
            Member::Value(value) => write!(f, "Value({})", value),
        }
    }
}

/// Full hook configuration of one method
#[derive(Clone, Default)]
pub struct MethodHooks {
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub context: Vec<Arc<dyn ContextUpdater>>,
    /// Replaces the default collection strategy for this method
    pub collect: Option<Arc<dyn Collector>>,
}

impl MethodHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn context<U: ContextUpdater + 'static>(mut self, updater: U) -> Self {
        self.context.push(Arc::new(updater));
        self
    }

    pub fn collect<C: Collector + 'static>(mut self, collector: C) -> Self {
        self.collect = Some(Arc::new(collector));
        self
    }

    fn merge(&mut self, other: MethodHooks) {
        self.middleware.extend(other.middleware);
        self.context.extend(other.context);
        if other.collect.is_some() {
            self.collect = other.collect;
        }
    }
}

impl std::fmt::Debug for MethodHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHooks")
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "context",
                &self.context.iter().map(|u| u.name()).collect::<Vec<_>>(),
            )
            .field("collect", &self.collect.as_ref().map(|c| c.name()))
            .finish()
    }
}

/// Hook entry for one method: a bare middleware list or a full configuration
#[derive(Clone)]
pub enum HookSpec {
    Middleware(Vec<Arc<dyn Middleware>>),
    Config(MethodHooks),
}

impl std::fmt::Debug for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookSpec::Middleware(middleware) => f
                .debug_tuple("Middleware")
                .field(&middleware.iter().map(|m| m.name()).collect::<Vec<_>>())
                .finish(),
            HookSpec::Config(hooks) => f.debug_tuple("Config").field(hooks).finish(),
        }
    }
}

impl From<Vec<Arc<dyn Middleware>>> for HookSpec {
    fn from(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        HookSpec::Middleware(middleware)
    }
}

impl From<MiddlewareStack> for HookSpec {
    fn from(stack: MiddlewareStack) -> Self {
        HookSpec::Middleware(stack.into_iter().collect())
    }
}

impl From<MethodHooks> for HookSpec {
    fn from(hooks: MethodHooks) -> Self {
        HookSpec::Config(hooks)
    }
}

impl From<HookSpec> for MethodHooks {
    fn from(spec: HookSpec) -> Self {
        match spec {
            HookSpec::Middleware(middleware) => MethodHooks {
                middleware,
                ..MethodHooks::default()
            },
            HookSpec::Config(hooks) => hooks,
        }
    }
}

/// Receiver plus its members, with per-method hooks
#[derive(Clone)]
pub struct HookedObject {
    type_name: String,
    receiver: Receiver,
    members: HashMap<String, Member>,
    hooks: HashMap<String, MethodHooks>,
    registry: HookRegistry,
    levels: Vec<Owner>,
    config: Option<HooksConfig>,
}

impl HookedObject {
    /// Wrap `receiver`; its Rust type name keys type-level hooks
    pub fn of<T: Any + Send + Sync>(receiver: T) -> Self {
        Self::new(std::any::type_name::<T>(), Arc::new(receiver))
    }

    pub fn new(type_name: impl Into<String>, receiver: Receiver) -> Self {
        let type_name = type_name.into();
        Self {
            levels: vec![Owner::Type(type_name.clone())],
            type_name,
            receiver,
            members: HashMap::new(),
            hooks: HashMap::new(),
            registry: HookRegistry::new(),
            config: None,
        }
    }

    pub fn with_method<T: Terminal + 'static>(mut self, name: impl Into<String>, method: T) -> Self {
        self.members.insert(name.into(), Member::Method(Arc::new(method)));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), Member::Value(value.into()));
        self
    }

    pub fn with_registry(mut self, registry: HookRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the type levels, outermost first.
    ///
    /// A derived type lists its base first so the base hooks wrap its own.
    pub fn with_levels(mut self, levels: Vec<Owner>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_config(mut self, config: &HooksConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    /// Attach hooks to methods.
    ///
    /// Every entry is checked before anything is attached, so a failed call
    /// leaves the object unchanged.
    pub fn hook<I, K, S>(&mut self, entries: I) -> Result<&mut Self, HookError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<HookSpec>,
    {
        let entries: Vec<(String, MethodHooks)> = entries
            .into_iter()
            .map(|(name, spec)| (name.into(), MethodHooks::from(spec.into())))
            .collect();

        for (name, _) in &entries {
            self.method(name)?;
        }

        for (name, hooks) in entries {
            debug!(
                target: "elif::hooks::object",
                owner = %self.type_name,
                method = %name,
                middleware = hooks.middleware.len(),
                updaters = hooks.context.len(),
                "hooked method"
            );
            self.hooks.entry(name).or_default().merge(hooks);
        }

        Ok(self)
    }

    /// Builder form of [`HookedObject::hook`]
    pub fn hooked<I, K, S>(mut self, entries: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<HookSpec>,
    {
        self.hook(entries)?;
        Ok(self)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_owner(&self) -> Owner {
        Owner::Type(self.type_name.clone())
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        match self.members.get(name) {
            Some(Member::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Names of every callable member, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .members
            .iter()
            .filter(|(_, member)| member.is_callable())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn hooks_of(&self, method: &str) -> Option<&MethodHooks> {
        self.hooks.get(method)
    }

    fn method(&self, name: &str) -> Result<&Arc<dyn Terminal>, HookError> {
        match self.members.get(name) {
            Some(Member::Method(terminal)) => Ok(terminal),
            Some(Member::Value(_)) => Err(HookError::configuration(format!(
                "member '{}' of {} is not callable",
                name, self.type_name
            ))),
            None => Err(HookError::configuration(format!(
                "no member named '{}' on {}",
                name, self.type_name
            ))),
        }
    }

    fn plan<'a>(&'a self, method: &str, owner: &'a Owner) -> ChainPlan<'a> {
        let hooks = self.hooks.get(method);
        ChainPlan {
            registry: &self.registry,
            collector: hooks
                .and_then(|h| h.collect.as_deref())
                .unwrap_or(&DefaultCollector),
            levels: &self.levels,
            callable: owner,
            middleware: hooks.map(|h| h.middleware.as_slice()).unwrap_or_default(),
            updaters: hooks.map(|h| h.context.as_slice()).unwrap_or_default(),
            config: self.config.as_ref(),
        }
    }

    /// Compose the chain of `method` as it stands right now
    pub fn compose(&self, method: &str) -> Result<Composed, HookError> {
        let terminal = Arc::clone(self.method(method)?);
        let owner = Owner::method(self.type_name.as_str(), method);
        Ok(self.plan(method, &owner).compose(terminal))
    }

    pub async fn invoke(&self, method: &str, arguments: Vec<Value>) -> Result<Context, HookError> {
        self.run(method, arguments, None).await
    }

    pub async fn call(&self, method: &str, arguments: Vec<Value>) -> Result<Option<Value>, HookError> {
        Ok(self.run(method, arguments, None).await?.result())
    }

    pub async fn call_with_context(
        &self,
        method: &str,
        arguments: Vec<Value>,
        context: Context,
    ) -> Result<Context, HookError> {
        self.run(method, arguments, Some(context)).await
    }

    async fn run(
        &self,
        method: &str,
        arguments: Vec<Value>,
        seed: Option<Context>,
    ) -> Result<Context, HookError> {
        let terminal = Arc::clone(self.method(method)?);
        let owner = Owner::method(self.type_name.as_str(), method);
        self.plan(method, &owner)
            .run(terminal, Some(&self.receiver), method, arguments, seed)
            .await
    }
}

impl std::fmt::Debug for HookedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookedObject")
            .field("type_name", &self.type_name)
            .field("members", &self.members)
            .field("hooks", &self.hooks)
            .field("levels", &self.levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elif_hooks_core::{method_fn, middleware_fn, Next, Props};
    use serde_json::json;

    struct Greeter {
        greeting: String,
    }

    fn greeter() -> HookedObject {
        HookedObject::of(Greeter {
            greeting: "hello".to_string(),
        })
        .with_method(
            "greet",
            method_fn("greet", |greeter: Arc<Greeter>, args: Vec<Value>| async move {
                let name = args.first().and_then(Value::as_str).unwrap_or("world");
                Ok(Some(json!(format!("{} {}", greeter.greeting, name))))
            }),
        )
        .with_value("version", 2)
    }

    fn shout() -> Arc<dyn Middleware> {
        Arc::new(middleware_fn("shout", |context: Context, next: Next| async move {
            next.run().await?;
            if let Some(Value::String(text)) = context.result() {
                context.set_result(text.to_uppercase());
            }
            Ok(())
        }))
    }

    #[tokio::test]
    async fn test_unhooked_method_call() {
        let object = greeter();
        assert_eq!(
            object.call("greet", vec![json!("rust")]).await.unwrap(),
            Some(json!("hello rust"))
        );
        assert_eq!(object.methods(), vec!["greet"]);
        assert_eq!(object.get_value("version"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_hooked_method_binds_receiver() {
        let object = greeter()
            .hooked([("greet", vec![shout()])])
            .unwrap();

        let context = object.invoke("greet", vec![json!("rust")]).await.unwrap();
        assert_eq!(context.result(), Some(json!("HELLO RUST")));
        assert_eq!(context.method().as_deref(), Some("greet"));
        assert!(context.receiver_as::<Greeter>().is_some());
    }

    #[tokio::test]
    async fn test_config_entry_adds_context_updaters() {
        let mut object = greeter();
        object
            .hook([(
                "greet",
                MethodHooks::new().context(Props::default().with("audited", true)),
            )])
            .unwrap();

        let context = object.invoke("greet", vec![]).await.unwrap();
        assert_eq!(context.get("audited"), Some(json!(true)));
        assert_eq!(context.result(), Some(json!("hello world")));
    }

    #[test]
    fn test_hooking_non_callable_member_fails() {
        let mut object = greeter();
        let err = object.hook([("version", vec![shout()])]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("not callable"));

        let err = object.hook([("missing", vec![shout()])]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no member named 'missing'"));
    }

    #[test]
    fn test_failed_hook_leaves_object_unchanged() {
        let mut object = greeter();
        let result = object.hook([("greet", vec![shout()]), ("version", vec![shout()])]);

        assert!(result.is_err());
        assert!(object.hooks_of("greet").is_none());
    }

    #[tokio::test]
    async fn test_calling_missing_method_fails() {
        let err = greeter().call("wave", vec![]).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
