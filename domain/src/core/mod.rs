//! Core domain concepts shared across all subdomains.
//!
//! - [`question::Question`]: the question a team run answers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod question;
