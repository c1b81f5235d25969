//! Records the model is asked to produce as structured output
//!
//! A [`StructuredOutput`] type knows the JSON Schema shown to the model and
//! any constraints serde cannot express on its own (non-empty collections,
//! unique keys, membership in a set of choices).

use crate::plan::{
    FactSheet, FinalAnswer, LedgerScope, NextSpeaker, Plan, ProgressLedger, SpeakerChoices,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// A record that can be requested from a model as a fenced JSON block.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    /// Per-request data the schema and validation depend on
    type Context;

    /// Name used in prompts and errors
    fn output_name() -> String {
        Self::schema_name().into_owned()
    }

    /// JSON Schema shown to the model
    fn output_schema(_ctx: &Self::Context) -> Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or_default()
    }

    /// Constraints checked after deserialization
    fn check(&self, _ctx: &Self::Context) -> Result<(), String> {
        Ok(())
    }
}

impl StructuredOutput for FactSheet {
    type Context = ();
}

impl StructuredOutput for Plan {
    type Context = ();

    fn check(&self, _ctx: &()) -> Result<(), String> {
        self.validate()
    }
}

impl StructuredOutput for ProgressLedger {
    type Context = LedgerScope;

    fn check(&self, scope: &LedgerScope) -> Result<(), String> {
        self.current_test.validate()?;
        scope.check(self)
    }
}

impl StructuredOutput for NextSpeaker {
    type Context = SpeakerChoices;

    fn output_schema(choices: &SpeakerChoices) -> Value {
        let mut schema = serde_json::to_value(schemars::schema_for!(Self)).unwrap_or_default();

        let mut allowed: Vec<Value> = choices.names().iter().map(|n| json!(n)).collect();
        allowed.push(Value::Null);

        // The choice type is shared, so it usually lands in the definitions
        for pointer in [
            "/$defs/ReasonedChoice/properties/answer",
            "/definitions/ReasonedChoice/properties/answer",
            "/properties/next_speaker/properties/answer",
        ] {
            if let Some(Value::Object(answer)) = schema.pointer_mut(pointer) {
                answer.insert("enum".to_string(), Value::Array(allowed));
                break;
            }
        }
        schema
    }

    fn check(&self, choices: &SpeakerChoices) -> Result<(), String> {
        self.check_choice(choices)
    }
}

impl StructuredOutput for FinalAnswer {
    type Context = ();
}
