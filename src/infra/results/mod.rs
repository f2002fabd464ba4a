//! Result store backends.

pub mod memory;

pub use memory::{InMemoryResultStore, ResultSummary};
