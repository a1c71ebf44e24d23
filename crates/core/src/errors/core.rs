use crate::config::ConfigError;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Core error type for the hooks system
#[derive(Debug, Error)]
pub enum HookError {
    /// `next()` was invoked more than once by the same middleware activation
    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    /// Failure raised by a middleware or by the wrapped function
    #[error(transparent)]
    Domain(DomainFailure),

    /// Registration-time misuse
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Arguments of '{method}' are derived from named parameters and cannot be set directly")]
    ReadOnlyArguments { method: String },

    #[error("Invocation timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Permission denied for '{method}': {reason}")]
    PermissionDenied { method: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HookError {
    /// Create a protocol violation error
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error as a domain failure
    pub fn domain<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Domain(DomainFailure::new(error))
    }

    /// Create a domain failure carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::Domain(DomainFailure::message(message))
    }

    /// Create a permission denied error
    pub fn permission_denied(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is a protocol violation
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Check if the error is a domain failure
    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Check if the error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Config(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Borrow the domain failure, if this is one
    pub fn as_domain(&self) -> Option<&DomainFailure> {
        match self {
            Self::Domain(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A failure raised inside the chain.
///
/// The underlying error is reference counted so it keeps its identity while it
/// travels up through every enclosing `next()` call.
#[derive(Clone)]
pub struct DomainFailure {
    inner: Arc<dyn StdError + Send + Sync>,
}

impl DomainFailure {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Attempt to view the underlying error as a concrete type
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Whether both failures are the very same error instance
    pub fn ptr_eq(&self, other: &DomainFailure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl fmt::Debug for DomainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for DomainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for DomainFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

impl From<DomainFailure> for HookError {
    fn from(failure: DomainFailure) -> Self {
        Self::Domain(failure)
    }
}

/// Plain message error used by [`DomainFailure::message`]
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MessageError(pub String);
