//! # Hook registry
//!
//! Explicit mapping from an owner (a type, a free function or one method of a
//! type) to the middleware and context updaters registered on it. Wrapped
//! functions and objects query it when they compose their chain.

use elif_hooks_core::{ContextUpdater, Middleware};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity hooks are registered against
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// Every method of a type
    Type(String),
    /// A free function
    Function(String),
    /// One method of a type
    Method { owner: String, method: String },
}

impl Owner {
    /// Type-level owner keyed by the Rust type name
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Owner::Type(std::any::type_name::<T>().to_string())
    }

    pub fn function(name: impl Into<String>) -> Self {
        Owner::Function(name.into())
    }

    pub fn method(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Owner::Method {
            owner: owner.into(),
            method: method.into(),
        }
    }

    /// Method owner for `method` of type `T`
    pub fn method_of<T: ?Sized + 'static>(method: impl Into<String>) -> Self {
        Self::method(std::any::type_name::<T>(), method)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Type(name) => write!(f, "type {}", name),
            Owner::Function(name) => write!(f, "fn {}", name),
            Owner::Method { owner, method } => write!(f, "{}::{}", owner, method),
        }
    }
}

/// Ordered hooks attached to one owner
#[derive(Clone, Default)]
pub struct Hooks {
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub updaters: Vec<Arc<dyn ContextUpdater>>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty() && self.updaters.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "updaters",
                &self.updaters.iter().map(|u| u.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Registry for hooks keyed by owner.
///
/// Cloning shares the underlying table.
#[derive(Clone, Default)]
pub struct HookRegistry {
    entries: Arc<RwLock<HashMap<Owner, Hooks>>>,
}

impl HookRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the owner's chain
    pub fn register_middleware<M>(&self, owner: Owner, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.register_middleware_arc(owner, Arc::new(middleware));
    }

    pub fn register_middleware_arc(&self, owner: Owner, middleware: Arc<dyn Middleware>) {
        tracing::debug!(
            target: "elif::hooks::registry",
            owner = %owner,
            middleware = middleware.name(),
            "registered middleware"
        );
        self.entries
            .write()
            .entry(owner)
            .or_default()
            .middleware
            .push(middleware);
    }

    /// Append a context updater to the owner's update chain
    pub fn register_updater<U>(&self, owner: Owner, updater: U)
    where
        U: ContextUpdater + 'static,
    {
        self.register_updater_arc(owner, Arc::new(updater));
    }

    pub fn register_updater_arc(&self, owner: Owner, updater: Arc<dyn ContextUpdater>) {
        self.entries
            .write()
            .entry(owner)
            .or_default()
            .updaters
            .push(updater);
    }

    /// Middleware registered on `owner`, in registration order
    pub fn middleware_for(&self, owner: &Owner) -> Vec<Arc<dyn Middleware>> {
        self.entries
            .read()
            .get(owner)
            .map(|hooks| hooks.middleware.clone())
            .unwrap_or_default()
    }

    /// Updaters registered on `owner`, in registration order
    pub fn updaters_for(&self, owner: &Owner) -> Vec<Arc<dyn ContextUpdater>> {
        self.entries
            .read()
            .get(owner)
            .map(|hooks| hooks.updaters.clone())
            .unwrap_or_default()
    }

    pub fn hooks_for(&self, owner: &Owner) -> Hooks {
        self.entries.read().get(owner).cloned().unwrap_or_default()
    }

    /// Check if anything is registered on `owner`
    pub fn contains(&self, owner: &Owner) -> bool {
        self.entries
            .read()
            .get(owner)
            .map(|hooks| !hooks.is_empty())
            .unwrap_or(false)
    }

    /// Remove every hook registered on `owner`
    pub fn clear(&self, owner: &Owner) -> Option<Hooks> {
        self.entries.write().remove(owner)
    }

    /// All owners with hooks, sorted for stable output
    pub fn owners(&self) -> Vec<Owner> {
        let mut owners: Vec<Owner> = self.entries.read().keys().cloned().collect();
        owners.sort();
        owners
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.read().iter()).finish()
    }
}
