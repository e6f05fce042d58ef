//! Check engine.
//!
//! Provides sequential check execution and result aggregation.

pub mod orchestrator;
pub mod result;
