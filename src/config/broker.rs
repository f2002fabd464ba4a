//! Broker configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-resource-class settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceClassConfig {
    /// Maximum tasks of this class running at once.
    pub max_concurrent: usize,
}

/// Root broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Global ceiling on running tasks across all classes.
    pub max_concurrent: usize,
    /// Ceiling for classes without an entry in `resource_classes`.
    pub default_class_limit: usize,
    /// Registered resource classes.
    pub resource_classes: HashMap<String, ResourceClassConfig>,
    /// Reject enqueues for classes missing from `resource_classes`.
    pub strict_resource_classes: bool,
    /// Per-attempt timeout when a request sets none, in seconds.
    pub default_timeout_secs: u64,
    /// Retry budget when a request sets none.
    pub default_max_retries: u32,
    /// How long terminal results are kept, in seconds.
    pub result_ttl_secs: u64,
    /// Cleanup loop period, in seconds.
    pub cleanup_interval_secs: u64,
    /// Dispatcher idle wait when nothing is eligible, in milliseconds.
    pub dispatch_interval_ms: u64,
    /// `get_result` polling period, in milliseconds.
    pub result_poll_interval_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1),
            default_class_limit: 2,
            resource_classes: HashMap::new(),
            strict_resource_classes: false,
            default_timeout_secs: 300,
            default_max_retries: 3,
            result_ttl_secs: 30 * 60,
            cleanup_interval_secs: 60,
            dispatch_interval_ms: 100,
            result_poll_interval_ms: 100,
        }
    }
}

impl BrokerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.default_class_limit == 0 {
            return Err("default_class_limit must be greater than 0".into());
        }
        if self.default_timeout_secs == 0 {
            return Err("default_timeout_secs must be greater than 0".into());
        }
        if self.cleanup_interval_secs == 0 {
            return Err("cleanup_interval_secs must be greater than 0".into());
        }
        if self.dispatch_interval_ms == 0 || self.result_poll_interval_ms == 0 {
            return Err("poll intervals must be greater than 0".into());
        }
        for (name, class) in &self.resource_classes {
            if name.is_empty() {
                return Err("resource class names must not be empty".into());
            }
            if class.max_concurrent == 0 {
                return Err(format!(
                    "resource class `{name}` invalid: max_concurrent must be greater than 0"
                ));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their [`Default`] values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `BROKER_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Recognised variables: `BROKER_MAX_CONCURRENT`,
    /// `BROKER_DEFAULT_CLASS_LIMIT`, `BROKER_STRICT_RESOURCE_CLASSES`,
    /// `BROKER_DEFAULT_TIMEOUT_SECS`, `BROKER_DEFAULT_MAX_RETRIES`,
    /// `BROKER_RESULT_TTL_SECS`, `BROKER_CLEANUP_INTERVAL_SECS`,
    /// `BROKER_DISPATCH_INTERVAL_MS`, `BROKER_RESULT_POLL_INTERVAL_MS` and
    /// `BROKER_RESOURCE_CLASSES` (`name=limit` pairs separated by commas).
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, "BROKER_MAX_CONCURRENT")? {
            cfg.max_concurrent = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_DEFAULT_CLASS_LIMIT")? {
            cfg.default_class_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_STRICT_RESOURCE_CLASSES")? {
            cfg.strict_resource_classes = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_DEFAULT_TIMEOUT_SECS")? {
            cfg.default_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_DEFAULT_MAX_RETRIES")? {
            cfg.default_max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_RESULT_TTL_SECS")? {
            cfg.result_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_CLEANUP_INTERVAL_SECS")? {
            cfg.cleanup_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_DISPATCH_INTERVAL_MS")? {
            cfg.dispatch_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "BROKER_RESULT_POLL_INTERVAL_MS")? {
            cfg.result_poll_interval_ms = v;
        }
        if let Some(raw) = lookup("BROKER_RESOURCE_CLASSES") {
            cfg.resource_classes = parse_class_list(&raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Register or override a resource class ceiling.
    #[must_use]
    pub fn with_class(mut self, name: impl Into<String>, max_concurrent: usize) -> Self {
        self.resource_classes
            .insert(name.into(), ResourceClassConfig { max_concurrent });
        self
    }

    /// Ceiling for `resource_class`, falling back to `default_class_limit`.
    #[must_use]
    pub fn class_limit(&self, resource_class: &str) -> usize {
        self.resource_classes
            .get(resource_class)
            .map_or(self.default_class_limit, |c| c.max_concurrent)
    }

    /// Whether `resource_class` is registered.
    #[must_use]
    pub fn is_registered(&self, resource_class: &str) -> bool {
        self.resource_classes.contains_key(resource_class)
    }

    /// Default per-attempt timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Result time-to-live.
    #[must_use]
    pub const fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    /// Cleanup loop period.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Dispatcher idle wait.
    #[must_use]
    pub const fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// `get_result` polling period.
    #[must_use]
    pub const fn result_poll_interval(&self) -> Duration {
        Duration::from_millis(self.result_poll_interval_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))
        })
        .transpose()
}

fn parse_class_list(raw: &str) -> Result<HashMap<String, ResourceClassConfig>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, limit) = pair
                .split_once('=')
                .ok_or_else(|| format!("BROKER_RESOURCE_CLASSES: expected name=limit, got `{pair}`"))?;
            let max_concurrent = limit
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("BROKER_RESOURCE_CLASSES: bad limit for `{name}`: {e}"))?;
            Ok((name.trim().to_string(), ResourceClassConfig { max_concurrent }))
        })
        .collect()
}
