//! Fluent construction of a [`Broker`] from configuration.

use std::time::Duration;

use crate::config::BrokerConfig;
use crate::core::{AuditSink, Broker, BrokerError};

/// Builds a [`Broker`], layering per-class overrides on a base configuration.
pub struct BrokerBuilder {
    name: String,
    config: BrokerConfig,
    audit: Option<Box<dyn AuditSink>>,
}

impl BrokerBuilder {
    /// Start from `config`; `name` only labels the broker in logs.
    pub fn new(name: impl Into<String>, config: BrokerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            audit: None,
        }
    }

    /// Start from environment variables (see [`BrokerConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidConfig` if a variable cannot be parsed.
    pub fn from_env(name: impl Into<String>) -> Result<Self, BrokerError> {
        let config = BrokerConfig::from_env().map_err(BrokerError::InvalidConfig)?;
        Ok(Self::new(name, config))
    }

    /// Broker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration assembled so far.
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Set the global concurrency ceiling.
    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    /// Register a resource class with its own ceiling.
    #[must_use]
    pub fn resource_class(mut self, name: impl Into<String>, max_concurrent: usize) -> Self {
        self.config = self.config.with_class(name, max_concurrent);
        self
    }

    /// Reject enqueues for unregistered classes.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict_resource_classes = strict;
        self
    }

    /// Default per-attempt timeout, rounded up to whole seconds.
    ///
    /// Sub-second timeouts can still be set per request.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout
            .as_secs()
            .saturating_add(u64::from(timeout.subsec_nanos() > 0));
        self.config.default_timeout_secs = secs.max(1);
        self
    }

    /// Default retry budget.
    #[must_use]
    pub fn default_max_retries(mut self, max_retries: u32) -> Self {
        self.config.default_max_retries = max_retries;
        self
    }

    /// Dispatcher idle wait and `get_result` polling period.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self.config.dispatch_interval_ms = ms;
        self.config.result_poll_interval_ms = ms;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    /// Validate the configuration and build a stopped broker.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidConfig` if validation fails.
    pub fn build(self) -> Result<Broker, BrokerError> {
        let broker = Broker::new(self.config)?;
        tracing::debug!(broker = %self.name, "broker built");
        Ok(match self.audit {
            Some(sink) => broker.with_audit(sink),
            None => broker,
        })
    }
}
