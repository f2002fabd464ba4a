//! Infrastructure adapters for queues and the result store.

pub mod queue;
pub mod results;

pub use queue::{QueuedTaskView, ResourceQueue};
pub use results::{InMemoryResultStore, ResultSummary};
