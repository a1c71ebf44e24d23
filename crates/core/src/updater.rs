//! # Context updaters
//!
//! Functions run in registration order right before the middleware chain to
//! build or enrich the invocation context.

use crate::context::{Context, Receiver, RESERVED_FIELDS};
use crate::errors::HookError;
use crate::terminal::Terminal;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// What is being called: receiver, method, terminal and raw arguments
pub struct CallSite<'a> {
    pub receiver: Option<&'a Receiver>,
    pub method: Option<&'a str>,
    /// Display name of the hook owner, e.g. `fn add` or `Repo::save`
    pub owner: Option<&'a str>,
    pub terminal: &'a dyn Terminal,
    pub arguments: &'a [Value],
}

impl<'a> CallSite<'a> {
    pub fn new(terminal: &'a dyn Terminal, arguments: &'a [Value]) -> Self {
        Self {
            receiver: None,
            method: None,
            owner: None,
            terminal,
            arguments,
        }
    }

    pub fn with_receiver(mut self, receiver: Option<&'a Receiver>) -> Self {
        self.receiver = receiver;
        self
    }

    pub fn with_method(mut self, method: Option<&'a str>) -> Self {
        self.method = method;
        self
    }

    pub fn with_owner(mut self, owner: Option<&'a str>) -> Self {
        self.owner = owner;
        self
    }
}

/// Builds or updates the context for one call
pub trait ContextUpdater: Send + Sync {
    fn update(&self, site: &CallSite<'_>, context: Context) -> Result<Context, HookError>;

    fn name(&self) -> &'static str {
        "ContextUpdater"
    }
}

impl<U: ContextUpdater + ?Sized> ContextUpdater for Arc<U> {
    fn update(&self, site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        (**self).update(site, context)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Baseline applied before any registered updater: raw arguments, receiver
/// and method name.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseContext;

impl ContextUpdater for BaseContext {
    fn update(&self, site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        if let Some(method) = site.method {
            context.set_method(method);
        }
        if let Some(owner) = site.owner {
            context.set_owner(owner);
        }
        if let Some(receiver) = site.receiver {
            context.set_receiver(Arc::clone(receiver));
        }
        // a reused context may still be in named mode from an earlier call;
        // named parameters are re-bound by their own updater
        context.reset_arguments(site.arguments.to_vec());
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "BaseContext"
    }
}

/// Binds positional arguments to parameter names.
///
/// Afterwards `context.arguments()` is derived from the named fields and can
/// no longer be set directly.
#[derive(Debug, Clone)]
pub struct NamedParams {
    names: Vec<String>,
}

impl NamedParams {
    /// Fails on reserved or duplicated names
    pub fn new<I, S>(names: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();

        for name in &names {
            if RESERVED_FIELDS.contains(&name.as_str()) {
                return Err(HookError::configuration(format!(
                    "parameter name '{}' is reserved",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(HookError::configuration(format!(
                    "parameter name '{}' is declared twice",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ContextUpdater for NamedParams {
    fn update(&self, site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        if !self.names.is_empty() {
            context.bind_named(&self.names, site.arguments);
        }
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "NamedParams"
    }
}

/// Fills fields that are still undefined
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: Map<String, Value>,
}

impl Defaults {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Build from a JSON object; anything else is a configuration error
    pub fn from_json(value: Value) -> Result<Self, HookError> {
        let values = expect_object("defaults", value)?;
        check_fields("defaults", &values)?;
        Ok(Self::new(values))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ContextUpdater for Defaults {
    fn update(&self, _site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        check_fields("defaults", &self.values)?;
        for (name, value) in &self.values {
            if !context.contains(name) {
                context.set(name.clone(), value.clone());
            }
        }
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "Defaults"
    }
}

/// Overwrites fields unconditionally
#[derive(Debug, Clone, Default)]
pub struct Props {
    values: Map<String, Value>,
}

impl Props {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn from_json(value: Value) -> Result<Self, HookError> {
        let values = expect_object("props", value)?;
        check_fields("props", &values)?;
        Ok(Self::new(values))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ContextUpdater for Props {
    fn update(&self, _site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        check_fields("props", &self.values)?;
        for (name, value) in &self.values {
            context.set(name.clone(), value.clone());
        }
        Ok(context)
    }

    fn name(&self) -> &'static str {
        "Props"
    }
}

/// Closure updater built by [`updater_fn`]
pub struct FnUpdater<F> {
    name: &'static str,
    handler: F,
}

impl<F> ContextUpdater for FnUpdater<F>
where
    F: Fn(&CallSite<'_>, Context) -> Result<Context, HookError> + Send + Sync,
{
    fn update(&self, site: &CallSite<'_>, context: Context) -> Result<Context, HookError> {
        (self.handler)(site, context)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

pub fn updater_fn<F>(name: &'static str, handler: F) -> FnUpdater<F>
where
    F: Fn(&CallSite<'_>, Context) -> Result<Context, HookError> + Send + Sync,
{
    FnUpdater { name, handler }
}

/// Build the context for one call.
///
/// Starts from `seed` (or a fresh context), applies [`BaseContext`] and then
/// every updater in order.
pub fn prepare_context(
    seed: Option<Context>,
    site: &CallSite<'_>,
    updaters: &[Arc<dyn ContextUpdater>],
) -> Result<Context, HookError> {
    let mut context = BaseContext.update(site, seed.unwrap_or_default())?;
    for updater in updaters {
        context = updater.update(site, context)?;
    }
    Ok(context)
}

/// `result` and `method` map onto their context slots; `arguments` and `self`
/// have typed setters and cannot be merged from a map.
fn check_fields(kind: &str, values: &Map<String, Value>) -> Result<(), HookError> {
    for (name, value) in values {
        match name.as_str() {
            "arguments" | "self" => {
                return Err(HookError::configuration(format!(
                    "{} cannot set reserved field '{}'",
                    kind, name
                )))
            }
            "method" if !value.is_string() => {
                return Err(HookError::configuration(format!(
                    "{} must give 'method' as a string, got {}",
                    kind, value
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

fn expect_object(kind: &str, value: Value) -> Result<Map<String, Value>, HookError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(HookError::configuration(format!(
            "{} must be a JSON object, got {}",
            kind, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::NoopTerminal;
    use serde_json::json;

    fn site<'a>(arguments: &'a [Value]) -> CallSite<'a> {
        CallSite::new(&NoopTerminal, arguments).with_method(Some("create"))
    }

    #[test]
    fn test_base_context() {
        let args = [json!(1), json!("two")];
        let context = prepare_context(None, &site(&args), &[]).unwrap();

        assert_eq!(context.method().as_deref(), Some("create"));
        assert_eq!(context.arguments(), args.to_vec());
        assert!(context.receiver().is_none());
    }

    #[test]
    fn test_named_params_round_trip() {
        let args = [json!(1), json!(2)];
        let updaters: Vec<Arc<dyn ContextUpdater>> =
            vec![Arc::new(NamedParams::new(["a", "b"]).unwrap())];

        let context = prepare_context(None, &site(&args), &updaters).unwrap();

        assert_eq!(context.get("a"), Some(json!(1)));
        assert_eq!(context.get("b"), Some(json!(2)));
        assert_eq!(context.arguments(), vec![json!(1), json!(2)]);

        let mut detached = context.arguments();
        detached[0] = json!(99);
        assert_eq!(context.get("a"), Some(json!(1)));
        assert!(context.set_arguments(vec![json!(5)]).is_err());
    }

    #[test]
    fn test_named_params_rejects_bad_names() {
        assert!(NamedParams::new(["result"]).unwrap_err().is_configuration());
        assert!(NamedParams::new(["a", "a"]).unwrap_err().is_configuration());
    }

    #[test]
    fn test_defaults_fill_only_missing_fields() {
        let args = [json!("x")];
        let updaters: Vec<Arc<dyn ContextUpdater>> = vec![
            Arc::new(NamedParams::new(["name", "limit"]).unwrap()),
            Arc::new(Defaults::default().with("name", "fallback").with("limit", 10)),
        ];

        let context = prepare_context(None, &site(&args), &updaters).unwrap();

        assert_eq!(context.get("name"), Some(json!("x")));
        assert_eq!(context.get("limit"), Some(json!(10)));
        assert_eq!(context.arguments(), vec![json!("x"), json!(10)]);
    }

    #[test]
    fn test_props_overwrite() {
        let seed = Context::new().with_field("role", "guest");
        let updaters: Vec<Arc<dyn ContextUpdater>> = vec![Arc::new(
            Props::from_json(json!({ "role": "admin", "tenant": "acme" })).unwrap(),
        )];

        let context = prepare_context(Some(seed.clone()), &site(&[]), &updaters).unwrap();

        assert!(context.ptr_eq(&seed));
        assert_eq!(context.get("role"), Some(json!("admin")));
        assert_eq!(context.get("tenant"), Some(json!("acme")));
        assert!(Props::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_updaters_run_in_order() {
        let updaters: Vec<Arc<dyn ContextUpdater>> = vec![
            Arc::new(updater_fn("first", |_site, context| {
                context.set("trail", "first");
                Ok(context)
            })),
            Arc::new(updater_fn("second", |site, context| {
                let trail = context.get("trail").unwrap_or_default();
                context.set("trail", format!("{}>second:{}", trail.as_str().unwrap_or(""), site.arguments.len()));
                Ok(context)
            })),
        ];

        let args = [json!(1)];
        let context = prepare_context(None, &site(&args), &updaters).unwrap();
        assert_eq!(context.get("trail"), Some(json!("first>second:1")));
    }

    #[test]
    fn test_reused_named_context_takes_new_raw_arguments() {
        let named: Vec<Arc<dyn ContextUpdater>> =
            vec![Arc::new(NamedParams::new(["a", "b"]).unwrap())];
        let context = prepare_context(None, &site(&[json!(1), json!(2)]), &named).unwrap();
        assert!(context.has_named_parameters());

        let reused = prepare_context(Some(context.clone()), &site(&[json!(5)]), &[]).unwrap();

        assert!(reused.ptr_eq(&context));
        assert!(!reused.has_named_parameters());
        assert_eq!(reused.arguments(), vec![json!(5)]);
        reused.set_argument(0, 6).unwrap();

        let rebound = prepare_context(Some(reused), &site(&[json!(7), json!(8)]), &named).unwrap();
        assert_eq!(rebound.get("a"), Some(json!(7)));
        assert_eq!(rebound.arguments(), vec![json!(7), json!(8)]);
    }

    #[test]
    fn test_result_and_method_from_props_and_defaults() {
        let props: Vec<Arc<dyn ContextUpdater>> =
            vec![Arc::new(Props::default().with("result", 42).with("method", "renamed"))];
        let context = prepare_context(None, &site(&[]), &props).unwrap();

        assert_eq!(context.result(), Some(json!(42)));
        assert_eq!(context.method().as_deref(), Some("renamed"));
        assert!(context.field_names().is_empty());

        let defaults: Vec<Arc<dyn ContextUpdater>> =
            vec![Arc::new(Defaults::default().with("result", "fallback").with("method", "other"))];
        let seed = Context::new();
        seed.set_result("kept");
        let context = prepare_context(Some(seed), &site(&[]), &defaults).unwrap();

        assert_eq!(context.result(), Some(json!("kept")));
        assert_eq!(context.method().as_deref(), Some("create"));

        let context = prepare_context(None, &site(&[]), &defaults).unwrap();
        assert_eq!(context.result(), Some(json!("fallback")));
    }

    #[test]
    fn test_reserved_fields_rejected_from_maps() {
        assert!(Props::from_json(json!({ "arguments": [1] })).unwrap_err().is_configuration());
        assert!(Defaults::from_json(json!({ "self": 1 })).unwrap_err().is_configuration());
        assert!(Props::from_json(json!({ "method": 3 })).unwrap_err().is_configuration());

        let updaters: Vec<Arc<dyn ContextUpdater>> =
            vec![Arc::new(Defaults::default().with("arguments", json!([1])))];
        let err = prepare_context(None, &site(&[]), &updaters).unwrap_err();
        assert!(err.is_configuration());
    }
}
