//! Prompts for the structured-output protocol

/// Templates wrapping a request for a structured record
pub struct StructuredPrompt;

impl StructuredPrompt {
    /// Instruction appended once to a conversation: reason first, then emit
    /// a fenced `json` block conforming to `schema`.
    pub fn reason_and_format(schema: &str) -> String {
        format!(
            r#"## Response Output Format

Think through the problem step by step and write out your reasoning in plain text. When you have finished reasoning, output a single json-formatted markdown code block containing the response.

### Response Schema

The response must be an INSTANCE that conforms to the following JSON Schema. Do not output the schema itself.

```json
{}
```

### Note

Your reply must contain both the plain text reasoning AND the fenced json block. Wrap the json in markdown tags like this:

```json
... your json here ...
```"#,
            schema
        )
    }

    /// Corrective message sent after a reply could not be parsed
    pub fn retry(error: &str) -> String {
        format!(
            r#"## Response Format Error

Your previous response could not be parsed into the expected format.

### Error

{}

Correct the JSON and respond again, keeping to the schema above."#,
            error
        )
    }
}
