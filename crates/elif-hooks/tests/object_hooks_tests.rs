//! Integration tests for hooking object methods
//!
//! Covers per-method hook maps, type-level registry hooks, explicit level
//! inheritance and environment-driven configuration of hooked objects.

use elif_hooks::prelude::*;
use elif_hooks::{Owner, CallTarget};
use parking_lot::Mutex;
use serde_json::{json, Value};
use serial_test::serial;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Account repository used as the hooked receiver
struct Accounts {
    balances: Mutex<Vec<i64>>,
}

impl Accounts {
    fn with_balances(balances: Vec<i64>) -> Self {
        Self {
            balances: Mutex::new(balances),
        }
    }
}

fn accounts() -> HookedObject {
    HookedObject::new(
        "Accounts",
        Arc::new(Accounts::with_balances(vec![100, 250])),
    )
    .with_method(
        "balance",
        method_fn("balance", |accounts: Arc<Accounts>, args: Vec<Value>| async move {
            let index = args.first().and_then(Value::as_u64).unwrap_or(0) as usize;
            Ok(accounts.balances.lock().get(index).map(|b| json!(b)))
        }),
    )
    .with_method(
        "deposit",
        method_fn("deposit", |accounts: Arc<Accounts>, args: Vec<Value>| async move {
            let index = args.first().and_then(Value::as_u64).unwrap_or(0) as usize;
            let amount = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            let mut balances = accounts.balances.lock();
            match balances.get_mut(index) {
                Some(balance) => {
                    *balance += amount;
                    Ok(Some(json!(*balance)))
                }
                None => Err(HookError::message(format!("no account {}", index))),
            }
        }),
    )
    .with_value("currency", "EUR")
}

fn tag(label: &'static str) -> impl Middleware {
    middleware_fn(label, move |context: Context, next: Next| async move {
        let mut tags = context.get("tags").unwrap_or_else(|| json!([]));
        if let Some(items) = tags.as_array_mut() {
            items.push(json!(label));
        }
        context.set("tags", tags);
        next.run().await
    })
}

#[tokio::test]
async fn test_permission_guard_on_one_method() {
    let object = accounts()
        .hooked([(
            "deposit",
            MethodHooks::new()
                .context(NamedParams::new(["account", "amount"]).unwrap())
                .middleware(PermissionMiddleware::new(|context| {
                    context.get("amount").and_then(|v| v.as_i64()).unwrap_or(0) > 0
                })),
        )])
        .unwrap();

    assert_eq!(
        object.call("deposit", vec![json!(0), json!(50)]).await.unwrap(),
        Some(json!(150))
    );

    let err = object.call("deposit", vec![json!(0), json!(-10)]).await.unwrap_err();
    assert!(matches!(err, HookError::PermissionDenied { .. }));

    // Unhooked methods are untouched
    assert_eq!(object.call("balance", vec![json!(0)]).await.unwrap(), Some(json!(150)));
}

#[tokio::test]
async fn test_cached_reads_skip_the_receiver() {
    let cache = CacheMiddleware::new(16).unwrap();
    let object = accounts()
        .hooked([("balance", MiddlewareStack::new().add(cache.clone()))])
        .unwrap();

    assert_eq!(object.call("balance", vec![json!(1)]).await.unwrap(), Some(json!(250)));
    object.call("deposit", vec![json!(1), json!(5)]).await.unwrap();

    let context = object.invoke("balance", vec![json!(1)]).await.unwrap();
    assert_eq!(context.result(), Some(json!(250)));
    assert_eq!(context.get("cache_hit"), Some(json!(true)));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));

    cache.invalidate_all();
    assert_eq!(object.call("balance", vec![json!(1)]).await.unwrap(), Some(json!(255)));
}

struct Greeter {
    greeting: &'static str,
}

fn greeter(type_name: &str, greeting: &'static str, cache: &CacheMiddleware) -> HookedObject {
    HookedObject::new(type_name, Arc::new(Greeter { greeting }))
        .with_method(
            "greet",
            method_fn("greet", |greeter: Arc<Greeter>, args: Vec<Value>| async move {
                let name = args.first().and_then(Value::as_str).unwrap_or("world");
                Ok(Some(json!(format!("{} {}", greeter.greeting, name))))
            }),
        )
        .hooked([("greet", MiddlewareStack::new().add(cache.clone()))])
        .unwrap()
}

#[tokio::test]
async fn test_shared_cache_keeps_owners_apart() {
    let cache = CacheMiddleware::new(16).unwrap();
    let english = greeter("EnglishGreeter", "hello", &cache);
    let french = greeter("FrenchGreeter", "bonjour", &cache);

    assert_eq!(english.call("greet", vec![json!("x")]).await.unwrap(), Some(json!("hello x")));
    assert_eq!(french.call("greet", vec![json!("x")]).await.unwrap(), Some(json!("bonjour x")));
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_shared_cache_scoped_by_receiver_state() {
    let cache = CacheMiddleware::new(16).unwrap().with_scope(|context| {
        context
            .receiver_as::<Greeter>()
            .map(|greeter| json!(greeter.greeting))
            .unwrap_or(Value::Null)
    });
    let hello = greeter("Greeter", "hello", &cache);
    let bonjour = greeter("Greeter", "bonjour", &cache);

    assert_eq!(hello.call("greet", vec![json!("x")]).await.unwrap(), Some(json!("hello x")));
    assert_eq!(bonjour.call("greet", vec![json!("x")]).await.unwrap(), Some(json!("bonjour x")));

    let again = hello.invoke("greet", vec![json!("x")]).await.unwrap();
    assert_eq!(again.result(), Some(json!("hello x")));
    assert_eq!(again.get("cache_hit"), Some(json!(true)));
    assert_eq!(again.owner().as_deref(), Some("Greeter::greet"));
}

#[tokio::test]
async fn test_type_hooks_wrap_method_hooks() {
    let registry = HookRegistry::new();
    registry.register_middleware(Owner::Type("Accounts".into()), tag("type"));
    registry.register_middleware(Owner::method("Accounts", "balance"), tag("registered"));

    let object = accounts()
        .with_registry(registry)
        .hooked([("balance", MiddlewareStack::new().add(tag("local")))])
        .unwrap();

    let context = object.invoke("balance", vec![]).await.unwrap();
    assert_eq!(context.get("tags"), Some(json!(["type", "registered", "local"])));

    let context = object.invoke("deposit", vec![json!(0), json!(1)]).await.unwrap();
    assert_eq!(context.get("tags"), Some(json!(["type"])));
}

#[tokio::test]
async fn test_base_levels_run_before_derived_levels() {
    let registry = HookRegistry::new();
    registry.register_middleware(Owner::Type("Ledger".into()), tag("base"));
    registry.register_middleware(Owner::Type("Accounts".into()), tag("derived"));

    let object = accounts().with_registry(registry.clone()).with_levels(vec![
        Owner::Type("Ledger".into()),
        Owner::Type("Accounts".into()),
    ]);

    let context = object.invoke("balance", vec![]).await.unwrap();
    assert_eq!(context.get("tags"), Some(json!(["base", "derived"])));

    // A per-method collector can narrow what applies
    let narrowed = accounts()
        .with_registry(registry)
        .hooked([("balance", MethodHooks::new().collect(CallableOnly))])
        .unwrap();
    let context = narrowed.invoke("balance", vec![]).await.unwrap();
    assert_eq!(context.get("tags"), None);
}

#[tokio::test]
async fn test_closure_collector_sees_call_target() {
    let registry = HookRegistry::new();
    registry.register_middleware(Owner::Type("Accounts".into()), tag("type"));

    let object = accounts()
        .with_registry(registry)
        .hooked([(
            "balance",
            MethodHooks::new().collect(collector_fn(
                "reversed",
                |registry: &HookRegistry, target: &CallTarget<'_>| {
                    let mut middleware = DefaultCollector.collect(registry, target);
                    middleware.reverse();
                    middleware
                },
            )),
        )])
        .unwrap();

    let composed = object.compose("balance").unwrap();
    assert_eq!(composed.names(), vec!["type"]);
}

#[test]
fn test_hook_map_rejects_data_members() {
    let mut object = accounts();

    let err = object
        .hook([("currency", MiddlewareStack::new().add(tag("never")))])
        .unwrap_err();
    assert!(err.is_configuration());

    let err = object
        .hook([("withdraw", MiddlewareStack::new().add(tag("never")))])
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(object.get_value("currency"), Some(&json!("EUR")));
}

#[tokio::test]
async fn test_receiver_errors_propagate() {
    let err = accounts()
        .call("deposit", vec![json!(9), json!(1)])
        .await
        .unwrap_err();

    assert!(err.is_domain());
    assert_eq!(err.to_string(), "no account 9");
}

#[tokio::test]
#[serial]
async fn test_environment_timeout_applies_to_methods() {
    env::set_var("ELIF_HOOKS_TIMEOUT_MS", "20");
    env::set_var("ELIF_HOOKS_TRACE", "false");
    let config = HooksConfig::from_env();
    env::remove_var("ELIF_HOOKS_TIMEOUT_MS");
    env::remove_var("ELIF_HOOKS_TRACE");
    let config = config.unwrap();

    assert_eq!(config.default_timeout, Some(Duration::from_millis(20)));

    let object = accounts()
        .with_method(
            "audit",
            terminal_fn("audit", |_| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(None)
            }),
        )
        .with_config(&config);

    assert_eq!(object.compose("audit").unwrap().names(), vec!["TimeoutMiddleware"]);
    assert!(object.call("audit", vec![]).await.unwrap_err().is_timeout());
    assert_eq!(object.call("balance", vec![]).await.unwrap(), Some(json!(100)));
}

#[tokio::test]
#[serial]
async fn test_invalid_environment_is_rejected() {
    env::set_var("ELIF_HOOKS_CACHE_CAPACITY", "lots");
    let result = HooksConfig::from_env();
    env::remove_var("ELIF_HOOKS_CACHE_CAPACITY");

    let err = HookError::from(result.unwrap_err());
    assert!(err.is_configuration());
}
