//! Stall counter

use serde::{Deserialize, Serialize};

/// Counts turns that made no progress on the current test.
///
/// A stalling turn adds one; a productive turn takes one away, never going
/// below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StallCounter(usize);

impl StallCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Record one turn and return the updated count.
    pub fn record(&mut self, stalling: bool) -> usize {
        self.0 = if stalling {
            self.0.saturating_add(1)
        } else {
            self.0.saturating_sub(1)
        };
        self.0
    }

    pub fn count(&self) -> usize {
        self.0
    }

    pub fn reached(&self, limit: usize) -> bool {
        self.0 >= limit
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl From<usize> for StallCounter {
    fn from(count: usize) -> Self {
        Self(count)
    }
}
