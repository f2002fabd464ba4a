//! Configuration models for the broker, resource classes, and timeouts.

pub mod broker;

pub use broker::{BrokerConfig, ResourceClassConfig};
