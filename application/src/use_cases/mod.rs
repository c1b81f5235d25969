//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod orchestrate;
pub mod run_team;
pub(crate) mod shared;
