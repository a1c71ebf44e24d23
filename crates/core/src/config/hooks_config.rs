use crate::config::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix shared by every setting
pub const ENV_PREFIX: &str = "ELIF_HOOKS_";

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::invalid_value(
                "environment",
                s,
                "development, testing, or production",
            )),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Invocation tracing is on by default outside production
    pub fn trace_default(&self) -> bool {
        !self.is_production()
    }
}

/// Runtime settings consumed by wrapped functions and built-in middleware
#[derive(Debug, Clone, PartialEq)]
pub struct HooksConfig {
    pub environment: Environment,
    /// Timeout applied around every wrapped call, `None` to wait forever
    pub default_timeout: Option<Duration>,
    /// Capacity of the memoizing cache middleware
    pub cache_capacity: usize,
    /// Emit a tracing span for every invocation
    pub trace_invocations: bool,
    pub log_level: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HooksConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            default_timeout: None,
            cache_capacity: 1_000,
            trace_invocations: true,
            log_level: "info".to_string(),
        }
    }

    /// Create configuration for testing
    pub fn testing() -> Self {
        Self {
            environment: Environment::Testing,
            default_timeout: Some(Duration::from_secs(5)),
            cache_capacity: 64,
            trace_invocations: true,
            log_level: "warn".to_string(),
        }
    }

    /// Create configuration for production
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            default_timeout: Some(Duration::from_secs(30)),
            cache_capacity: 10_000,
            trace_invocations: false,
            log_level: "info".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.default_timeout = None;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace_invocations = enabled;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Load configuration from `ELIF_HOOKS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(env_str) = read_var("ENV") {
            config.environment = env_str.parse()?;
        }

        config.trace_invocations = match read_var("TRACE") {
            Some(flag) => parse_flag("trace", &flag)?,
            None => config.environment.trace_default(),
        };

        if let Some(timeout) = read_var("TIMEOUT_MS") {
            let millis: u64 = timeout.parse().map_err(|_| {
                ConfigError::invalid_value("timeout_ms", &timeout, "timeout in milliseconds")
            })?;
            config.default_timeout = match millis {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            };
        }

        if let Some(capacity) = read_var("CACHE_CAPACITY") {
            config.cache_capacity = capacity.parse().map_err(|_| {
                ConfigError::invalid_value("cache_capacity", &capacity, "positive integer")
            })?;
        }

        if let Some(level) = read_var("LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::validation_failed(
                "cache_capacity must be greater than zero",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                &self.log_level,
                "one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_flag(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(field, value, "boolean flag")),
    }
}
