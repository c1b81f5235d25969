//! Messages exchanged in a team run and sent to model backends

use serde::{Deserialize, Serialize};

/// Placeholder left where an image is removed for a text-only backend
pub const IMAGE_PLACEHOLDER: &str = "<image>";

/// An image attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { image: ImageData },
}

/// Message body: plain text or a sequence of parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text content, with image parts rendered as a placeholder
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.as_str(),
                    ContentPart::Image { .. } => IMAGE_PLACEHOLDER,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn has_images(&self) -> bool {
        match self {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::Image { .. })),
        }
    }

    /// Copy of this content with every image replaced by a text placeholder
    pub fn without_images(&self) -> MessageContent {
        match self {
            MessageContent::Text(_) => self.clone(),
            MessageContent::Parts(parts) => MessageContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Image { .. } => ContentPart::Text {
                            text: IMAGE_PLACEHOLDER.to_string(),
                        },
                        other => other.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

/// What a chat message represents in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary text or multimodal content
    #[default]
    Text,
    /// A participant asking for tool calls
    ToolCallRequest,
    /// Raw results of tool calls
    ToolCallExecution,
    /// Textual summary of tool call results
    ToolCallSummary,
    /// A participant asking the run to stop
    Stop,
    /// A participant handing off to someone else
    Handoff,
}

impl MessageKind {
    /// Tool call traffic is kept in the transcript but never shown to the orchestrator model
    pub fn is_tool_traffic(&self) -> bool {
        matches!(
            self,
            MessageKind::ToolCallRequest | MessageKind::ToolCallExecution
        )
    }
}

/// A message in the team conversation (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Name of the participant (or orchestrator) that produced the message
    pub source: String,
    #[serde(default)]
    pub kind: MessageKind,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: MessageKind::Text,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn multimodal(source: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self {
            source: source.into(),
            kind: MessageKind::Text,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn content_text(&self) -> String {
        self.content.to_text()
    }
}

/// Role of a message sent to a model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message sent to a model backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    #[serde(default)]
    pub source: Option<String>,
    pub content: MessageContent,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            source: None,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(source: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::User,
            source: Some(source.into()),
            content: content.into(),
        }
    }

    pub fn assistant(source: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::Assistant,
            source: Some(source.into()),
            content: content.into(),
        }
    }

    pub fn text(&self) -> String {
        self.content.to_text()
    }
}

/// Replace image parts with placeholders for a backend without vision
pub fn strip_images(messages: &[LlmMessage]) -> Vec<LlmMessage> {
    messages
        .iter()
        .map(|m| LlmMessage {
            role: m.role,
            source: m.source.clone(),
            content: m.content.without_images(),
        })
        .collect()
}
