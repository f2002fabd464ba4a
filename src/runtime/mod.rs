//! API surface for transport layers built on top of the broker.

pub mod api;

pub use api::{health, submit_task, task_status, Health, TaskStatusResponse, TaskSubmission};
