//! Error handling for the aggregator
//!
//! Errors are split by pipeline stage so that per-source and per-entry
//! failures stay local to their stage and are never escalated past it.
//! Only [`AppError`] is visible to callers of the pipeline.

pub mod types;

pub use types::*;

/// Convenience result type using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;
