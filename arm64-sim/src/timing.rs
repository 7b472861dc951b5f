//! The cycle-accurate timing model: cache hierarchy,
//! branch predictor, per-operation latencies, and the pipeline that ties
//! them together around the same [`crate::exec`] functional units the
//! [`crate::interpreter::Interpreter`] uses.

pub mod cache;
pub mod latency;
pub mod pipeline;
pub mod predictor;
pub mod stats;

pub use cache::Cache;
pub use pipeline::{Pipeline, TickOutcome};
pub use predictor::BranchPredictor;
pub use stats::{CacheStats, Statistics};
