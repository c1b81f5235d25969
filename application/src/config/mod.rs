//! Application-level configuration.
//!
//! - [`OrchestrationParams`]: hypothesis loop control (turn ceilings, stalls, retries)

pub mod orchestration_params;

pub use orchestration_params::OrchestrationParams;
