//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod bench_policy;
pub mod checkpoint;
pub mod conversation_logger;
pub mod model_backend;
pub mod participant;
pub mod progress;
pub mod transport;
