//! # Cache Middleware
//!
//! Memoizes results by owner, method name and arguments. A hit sets the
//! result and short-circuits the chain, so neither inner middleware nor the
//! wrapped function run.

use blake3::Hasher;
use elif_hooks_core::{Context, HookError, HookFuture, HooksConfig, Middleware, Next};
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Context field set to `true` on a cache hit
pub const CACHE_HIT_FIELD: &str = "cache_hit";

type Scope = Arc<dyn Fn(&Context) -> Value + Send + Sync>;

/// Result memoization middleware.
///
/// Clones share the same store, so one cache can front several wrapped
/// functions. Keys include the hook owner (`fn add`, `Repo::save`); state of
/// the receiver only takes part through [`CacheMiddleware::with_scope`].
#[derive(Clone)]
pub struct CacheMiddleware {
    store: Arc<Mutex<LruCache<String, Value>>>,
    key_prefix: String,
    scope: Option<Scope>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheMiddleware {
    /// Create a cache holding at most `capacity` results
    pub fn new(capacity: usize) -> Result<Self, HookError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| HookError::configuration("cache capacity must be greater than zero"))?;

        Ok(Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
            key_prefix: "hook_result:".to_string(),
            scope: None,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn from_hooks_config(config: &HooksConfig) -> Result<Self, HookError> {
        Self::new(config.cache_capacity)
    }

    /// Set the cache key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Mix an extra value derived from the context into every key, e.g. the
    /// receiver state a method result depends on
    pub fn with_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&Context) -> Value + Send + Sync + 'static,
    {
        self.scope = Some(Arc::new(scope));
        self
    }

    /// Derive the cache key of a call
    pub fn cache_key(&self, context: &Context) -> Result<String, HookError> {
        let scope = self.scope.as_ref().map(|scope| scope(context)).unwrap_or(Value::Null);
        let encoded = serde_json::to_vec(&(context.arguments(), scope)).map_err(HookError::domain)?;

        let mut hasher = Hasher::new();
        for part in [context.owner(), context.method()] {
            hasher.update(part.unwrap_or_default().as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&encoded);

        Ok(format!(
            "{}{}",
            self.key_prefix,
            hex::encode(hasher.finalize().as_bytes())
        ))
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Drop every cached result
    pub fn invalidate_all(&self) {
        self.store.lock().clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for CacheMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMiddleware")
            .field("key_prefix", &self.key_prefix)
            .field("scoped", &self.scope.is_some())
            .field("len", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, context: Context, next: Next) -> HookFuture<'static> {
        let cache = self.clone();

        Box::pin(async move {
            let key = cache.cache_key(&context)?;

            let cached = cache.store.lock().get(&key).cloned();
            if let Some(value) = cached {
                cache.hits.fetch_add(1, Ordering::Relaxed);
                debug!(target: "elif::hooks::cache", key = %key, "cache hit");
                context.set_result(value);
                context.set(CACHE_HIT_FIELD, true);
                return Ok(());
            }

            cache.misses.fetch_add(1, Ordering::Relaxed);
            debug!(target: "elif::hooks::cache", key = %key, "cache miss");
            next.run().await?;

            if let Some(result) = context.result() {
                cache.store.lock().put(key, result);
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "CacheMiddleware"
    }
}
