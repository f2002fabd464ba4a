/// Wall-clock helpers.
pub mod clock;
/// Identifiers and priority levels.
pub mod serde;
/// Tracing subscriber setup.
pub mod telemetry;

pub use self::clock::*;
pub use self::serde::*;
pub use self::telemetry::*;
