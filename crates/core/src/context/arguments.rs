use serde_json::{Map, Value};

/// Storage strategy for call arguments
#[derive(Debug, Clone)]
pub(crate) enum Arguments {
    /// Arguments owned by the context and freely settable
    Positional(Vec<Value>),
    /// Arguments derived from named fields; read-only
    Named(Vec<String>),
}

impl Default for Arguments {
    fn default() -> Self {
        Arguments::Positional(Vec::new())
    }
}

impl Arguments {
    /// Materialize the current argument list.
    ///
    /// In named mode an unset field shows up as `null` so positions are kept.
    pub(crate) fn snapshot(&self, fields: &Map<String, Value>) -> Vec<Value> {
        match self {
            Arguments::Positional(values) => values.clone(),
            Arguments::Named(names) => names
                .iter()
                .map(|name| fields.get(name).cloned().unwrap_or(Value::Null))
                .collect(),
        }
    }

    pub(crate) fn is_named(&self) -> bool {
        matches!(self, Arguments::Named(_))
    }

    pub(crate) fn names(&self) -> &[String] {
        match self {
            Arguments::Named(names) => names,
            Arguments::Positional(_) => &[],
        }
    }
}
