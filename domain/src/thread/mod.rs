//! Conversation messages and the hypothesis work thread

pub mod message;
pub mod thread;

pub use message::{
    ChatMessage, ContentPart, ImageData, LlmMessage, MessageContent, MessageKind, Role,
    strip_images,
};
pub use thread::MessageThread;
