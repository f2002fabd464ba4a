//! # Prometheus Agent Broker
//!
//! A priority task broker for agent workloads.
//!
//! Work is submitted as tasks tagged with a resource class ("agent type").
//! Each class has its own priority queue and concurrency ceiling, and a
//! global ceiling bounds everything running at once. A single dispatcher
//! picks the most urgent task among classes with spare capacity, runs it
//! through a caller-supplied [`TaskExecutor`](core::TaskExecutor) under a
//! timeout, retries failures up to a per-task budget, and keeps the terminal
//! result until it is acknowledged or expires.
//!
//! ## Key Features
//!
//! - **Per-class ceilings**: a saturated class never blocks the others
//! - **Priority then FIFO**: `Critical` before `Low`, creation order within a level
//! - **Lazy cancellation**: cancelling a queued task is O(1)
//! - **Bounded retry**: failures and timeouts go back to their queue with their original position
//! - **Result lifecycle**: idempotent reads, explicit acknowledgement, TTL eviction
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_agent_broker::builders::BrokerBuilder;
//! use prometheus_agent_broker::config::BrokerConfig;
//! use prometheus_agent_broker::core::{AppResult, TaskExecutor, TaskMetadata, TaskRequest};
//! use prometheus_agent_broker::util::Priority;
//! use serde_json::{json, Value};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl TaskExecutor for Echo {
//!     async fn execute(&self, payload: Value, _meta: TaskMetadata) -> AppResult<Value> {
//!         Ok(payload)
//!     }
//! }
//!
//! let broker = BrokerBuilder::new("agents", BrokerConfig::default())
//!     .resource_class("scout", 4)
//!     .resource_class("developer", 1)
//!     .build()?;
//! broker.start(Echo)?;
//!
//! let id = broker.enqueue(
//!     TaskRequest::new("scout", "scan")
//!         .with_payload(json!({"target": "repo"}))
//!         .with_priority(Priority::Critical)
//!         .with_timeout(Duration::from_secs(1)),
//! )?;
//! let summary = broker.get_result(id, Duration::from_secs(5)).await?;
//! broker.stop().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task model, executor seam, audit trail and the broker itself.
pub mod core;
/// Configuration models for the broker and its resource classes.
pub mod config;
/// Builders to construct a broker from configuration.
pub mod builders;
/// Resource queues and the result store.
pub mod infra;
/// Request/response models for transport layers.
pub mod runtime;
/// Shared utilities.
pub mod util;
