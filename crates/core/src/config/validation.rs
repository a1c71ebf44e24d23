use thiserror::Error;

/// Errors raised while loading or validating `HooksConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting could not be parsed; `field` is the setting without its prefix
    #[error("Invalid {field} setting '{value}': expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Hooks configuration rejected: {message}")]
    ValidationFailed { message: String },
}

impl ConfigError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Name of the offending setting, when one is known
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } => Some(field),
            Self::ValidationFailed { .. } => None,
        }
    }
}
