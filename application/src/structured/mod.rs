//! Structured output requests with bounded retries

pub mod retry;

pub use retry::RetryCoordinator;
