//! Port for the machine-readable run transcript.
//!
//! `tracing` carries diagnostics for people reading a terminal or log file.
//! [`ConversationLogger`] carries the events a tool would replay: every
//! structured-output attempt, plan, ledger, speaker choice and final answer,
//! each with its full JSON payload.

use serde_json::Value;
use std::sync::Mutex;

/// One transcript record. The adapter stamps the time and sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEvent {
    /// Record type, e.g. "plan_created" or "speaker_selected"
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for transcript records.
///
/// `log` cannot fail: an adapter that loses a record reports it through
/// `tracing` and the run carries on.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Discards every record
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

/// Keeps records in memory, for embedding callers and tests
#[derive(Default)]
pub struct MemoryConversationLogger {
    events: Mutex<Vec<ConversationEvent>>,
}

impl MemoryConversationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConversationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Record types in the order they were logged
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl ConversationLogger for MemoryConversationLogger {
    fn log(&self, event: ConversationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
