//! # Invocation context
//!
//! The mutable attribute bag shared by every middleware of one invocation.
//! `Context` is a handle: cloning it hands out another reference to the same
//! state, never a copy.

mod arguments;

use crate::errors::HookError;
use arguments::Arguments;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The receiver (`self`) of a wrapped method call
pub type Receiver = Arc<dyn Any + Send + Sync>;

/// Field names that live outside the named-field bag
pub const RESERVED_FIELDS: [&str; 4] = ["result", "method", "arguments", "self"];

const RESULT_FIELD: &str = "result";
const METHOD_FIELD: &str = "method";

#[derive(Default)]
struct ContextState {
    method: Option<String>,
    owner: Option<String>,
    receiver: Option<Receiver>,
    arguments: Arguments,
    result: Option<Value>,
    fields: Map<String, Value>,
}

/// Shared per-invocation state threaded through the middleware chain
#[derive(Clone)]
pub struct Context {
    id: Uuid,
    state: Arc<RwLock<ContextState>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(RwLock::new(ContextState::default())),
        }
    }

    /// Create a context for a named operation
    pub fn for_method(method: impl Into<String>) -> Self {
        let context = Self::new();
        context.set_method(method);
        context
    }

    /// Seed a field before the call (builder style)
    pub fn with_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Unique id of this invocation
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether both handles point at the same invocation state
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn method(&self) -> Option<String> {
        self.state.read().method.clone()
    }

    pub fn set_method(&self, method: impl Into<String>) {
        self.state.write().method = Some(method.into());
    }

    /// Display name of whatever the hooks were collected for, e.g. `Repo::save`
    pub fn owner(&self) -> Option<String> {
        self.state.read().owner.clone()
    }

    pub fn set_owner(&self, owner: impl Into<String>) {
        self.state.write().owner = Some(owner.into());
    }

    pub fn receiver(&self) -> Option<Receiver> {
        self.state.read().receiver.clone()
    }

    /// Typed access to the receiver
    pub fn receiver_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.receiver()?.downcast::<T>().ok()
    }

    pub fn set_receiver(&self, receiver: Receiver) {
        self.state.write().receiver = Some(receiver);
    }

    /// Current result, `None` while undefined
    pub fn result(&self) -> Option<Value> {
        self.state.read().result.clone()
    }

    pub fn has_result(&self) -> bool {
        self.state.read().result.is_some()
    }

    pub fn set_result(&self, value: impl Into<Value>) {
        self.state.write().result = Some(value.into());
    }

    /// Reset the result to undefined
    pub fn clear_result(&self) {
        self.state.write().result = None;
    }

    pub fn take_result(&self) -> Option<Value> {
        self.state.write().result.take()
    }

    /// Store a terminal's return value unless a result is already present
    pub(crate) fn fill_result(&self, value: Option<Value>) {
        let mut state = self.state.write();
        if state.result.is_none() {
            state.result = value;
        }
    }

    /// Snapshot of the call arguments.
    ///
    /// The returned vector is detached: mutating it never touches the context.
    pub fn arguments(&self) -> Vec<Value> {
        let state = self.state.read();
        state.arguments.snapshot(&state.fields)
    }

    /// Replace the call arguments.
    ///
    /// Fails once named parameters are bound, since arguments are then derived
    /// from the named fields.
    pub fn set_arguments(&self, arguments: Vec<Value>) -> Result<(), HookError> {
        let mut state = self.state.write();
        if state.arguments.is_named() {
            return Err(Self::read_only(&state));
        }
        state.arguments = Arguments::Positional(arguments);
        Ok(())
    }

    /// Go back to positional mode with fresh call arguments
    pub(crate) fn reset_arguments(&self, arguments: Vec<Value>) {
        self.state.write().arguments = Arguments::Positional(arguments);
    }

    /// Replace a single argument, extending the list with `null` if needed
    pub fn set_argument(&self, index: usize, value: impl Into<Value>) -> Result<(), HookError> {
        let mut state = self.state.write();
        if state.arguments.is_named() {
            return Err(Self::read_only(&state));
        }
        if let Arguments::Positional(values) = &mut state.arguments {
            if values.len() <= index {
                values.resize(index + 1, Value::Null);
            }
            values[index] = value.into();
        }
        Ok(())
    }

    /// Whether arguments are derived from named parameters
    pub fn has_named_parameters(&self) -> bool {
        self.state.read().arguments.is_named()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.state.read().arguments.names().to_vec()
    }

    /// Switch to named mode: bind `values[i]` to `names[i]`.
    ///
    /// Missing positions stay undefined; surplus values are dropped.
    pub(crate) fn bind_named(&self, names: &[String], values: &[Value]) {
        let mut state = self.state.write();
        for (name, value) in names.iter().zip(values) {
            state.fields.insert(name.clone(), value.clone());
        }
        state.arguments = Arguments::Named(names.to_vec());
    }

    /// Read a field.
    ///
    /// `result` and `method` read the dedicated slots rather than the bag.
    pub fn get(&self, name: &str) -> Option<Value> {
        let state = self.state.read();
        match name {
            RESULT_FIELD => state.result.clone(),
            METHOD_FIELD => state.method.clone().map(Value::String),
            _ => state.fields.get(name).cloned(),
        }
    }

    /// Write a field, returning the previous value.
    ///
    /// `result` and `method` go to their slots; a `null` method clears it and
    /// any other non-string method is stored as its JSON text.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        let mut state = self.state.write();
        if name == RESULT_FIELD {
            return state.result.replace(value);
        }
        if name == METHOD_FIELD {
            let method = match value {
                Value::Null => None,
                Value::String(method) => Some(method),
                other => Some(other.to_string()),
            };
            return std::mem::replace(&mut state.method, method).map(Value::String);
        }
        state.fields.insert(name, value)
    }

    pub fn contains(&self, name: &str) -> bool {
        let state = self.state.read();
        match name {
            RESULT_FIELD => state.result.is_some(),
            METHOD_FIELD => state.method.is_some(),
            _ => state.fields.contains_key(name),
        }
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut state = self.state.write();
        match name {
            RESULT_FIELD => state.result.take(),
            METHOD_FIELD => state.method.take().map(Value::String),
            _ => state.fields.remove(name),
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.state.read().fields.keys().cloned().collect()
    }

    /// Render the context as JSON for logging and debugging
    pub fn snapshot(&self) -> Value {
        let state = self.state.read();
        json!({
            "id": self.id.to_string(),
            "method": state.method,
            "owner": state.owner,
            "has_receiver": state.receiver.is_some(),
            "arguments": state.arguments.snapshot(&state.fields),
            "result": state.result,
            "fields": state.fields,
        })
    }

    fn read_only(state: &ContextState) -> HookError {
        HookError::ReadOnlyArguments {
            method: state
                .method
                .clone()
                .unwrap_or_else(|| "<anonymous>".to_string()),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("method", &state.method)
            .field("owner", &state.owner)
            .field("receiver", &state.receiver.as_ref().map(|_| "<receiver>"))
            .field("arguments", &state.arguments)
            .field("result", &state.result)
            .field("fields", &state.fields)
            .finish()
    }
}
