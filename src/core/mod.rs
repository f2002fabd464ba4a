//! Core scheduling abstractions: task records, the executor seam, and the broker.

pub mod audit;
pub mod broker;
pub mod error;
pub mod executor;
pub mod task;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use broker::{Broker, BrokerStats, ClassStats};
pub use error::{AppResult, BrokerError};
pub use executor::TaskExecutor;
pub use task::{CompletionCallback, OrderKey, TaskMetadata, TaskRecord, TaskRequest, TaskStatus};
