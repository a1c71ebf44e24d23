//! # Logging setup
//!
//! Subscriber installation for applications that use hooked functions.
//! Composer and middleware events are emitted under `elif::hooks*` targets.

use elif_hooks_core::{Environment, HooksConfig};
use serde_json::{json, Value};
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Include timestamp in logs
    pub include_timestamp: bool,
    /// Custom fields reported with the initialization event
    pub global_fields: serde_json::Map<String, Value>,
    /// Environment filter (e.g. "elif::hooks=debug,elif::hooks::timing=warn")
    pub env_filter: Option<String>,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: false,
            include_timestamp: true,
            global_fields: serde_json::Map::new(),
            env_filter: None,
            service_name: None,
            service_version: None,
        }
    }
}

fn env_fields(env: &str) -> serde_json::Map<String, Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("env".to_string(), json!(env));
    fields
}

impl LoggingConfig {
    /// JSON output, info level
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            include_timestamp: true,
            global_fields: env_fields("production"),
            env_filter: Some("elif::hooks=info".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Pretty output with source locations, composer hops visible
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            include_timestamp: true,
            global_fields: env_fields("development"),
            env_filter: Some("elif::hooks=trace".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Minimal output
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            include_timestamp: false,
            global_fields: env_fields("test"),
            env_filter: Some("elif::hooks=error".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Pick the preset for the configured environment and apply its log level
    pub fn from_hooks_config(config: &HooksConfig) -> Self {
        let preset = match config.environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
            Environment::Testing => Self::test(),
        };
        Self {
            level: config.log_level.clone(),
            env_filter: Some(format!("elif::hooks={}", config.log_level)),
            ..preset
        }
    }

    /// Add a global field to include in the initialization event
    pub fn with_global_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.global_fields.insert(key.into(), value.into());
        self
    }

    /// Set service name and version
    pub fn with_service(mut self, name: &str, version: &str) -> Self {
        self.service_name = Some(name.to_string());
        self.service_version = Some(version.to_string());
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        let directives = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Fails instead of
/// panicking when a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.filter()?;
    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let registry = tracing_subscriber::registry().with(filter);
    match (config.json_format, config.pretty_print, config.include_timestamp) {
        (true, _, _) => registry.with(layer.json()).try_init()?,
        (false, true, _) => registry.with(layer.pretty()).try_init()?,
        (false, false, true) => registry.with(layer).try_init()?,
        (false, false, false) => registry.with(layer.without_time()).try_init()?,
    }

    let mut init_msg = json!({
        "message": "hooks logging initialized",
        "config": {
            "level": config.level,
            "json_format": config.json_format,
            "pretty_print": config.pretty_print,
        }
    });
    if let Some(name) = config.service_name {
        init_msg["service_name"] = json!(name);
    }
    if let Some(version) = config.service_version {
        init_msg["service_version"] = json!(version);
    }
    for (key, value) in config.global_fields {
        init_msg[key] = value;
    }

    tracing::info!(target: "elif::hooks::logging", "{}", init_msg);
    Ok(())
}
