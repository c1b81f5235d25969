//! Team roster

pub mod roster;

pub use roster::{Roster, TeamMember};
