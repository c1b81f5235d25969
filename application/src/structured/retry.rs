//! Retry coordinator for structured model output.
//!
//! Wraps one "produce a structured record" request: the conversation gets a
//! reason-and-format instruction carrying the JSON schema, and every failed
//! parse is retried with a single corrective message describing the error.
//! Failed attempts are never accumulated; each retry is the augmented
//! conversation plus exactly one corrective message.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::model_backend::ModelBackend;
use crate::use_cases::orchestrate::OrchestratorError;
use crate::use_cases::shared::check_cancelled;
use hypoloop_domain::{
    LlmMessage, ParseError, StructuredOutput, StructuredPrompt, extract_structured, strip_images,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Source recorded on instructions the coordinator adds
const INSTRUCTION_SOURCE: &str = "user";

#[derive(Clone)]
pub struct RetryCoordinator {
    backend: Arc<dyn ModelBackend>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RetryCoordinator {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Request a `T` from the backend, retrying up to `max_attempts` times.
    ///
    /// Backend errors are not retried. With `max_attempts == 0` no request is
    /// made and the result is `RetryExhausted` immediately.
    pub async fn produce<T: StructuredOutput>(
        &self,
        conversation: &[LlmMessage],
        ctx: &T::Context,
        max_attempts: usize,
        cancellation_token: Option<&CancellationToken>,
    ) -> Result<T, OrchestratorError> {
        let name = T::output_name();
        let schema = serde_json::to_string_pretty(&T::output_schema(ctx)).unwrap_or_default();

        let mut augmented = conversation.to_vec();
        augmented.push(LlmMessage::user(
            INSTRUCTION_SOURCE,
            StructuredPrompt::reason_and_format(&schema),
        ));

        let vision = self.backend.capabilities().vision;
        let mut last_error: Option<ParseError> = None;

        for attempt in 1..=max_attempts {
            check_cancelled(cancellation_token)?;

            let mut request = augmented.clone();
            if let Some(error) = &last_error {
                request.push(LlmMessage::user(
                    INSTRUCTION_SOURCE,
                    StructuredPrompt::retry(&error.to_string()),
                ));
            }
            if !vision {
                request = strip_images(&request);
            }

            debug!(
                "Requesting {} (attempt {}/{}, {} messages)",
                name,
                attempt,
                max_attempts,
                request.len()
            );
            self.conversation_logger.log(ConversationEvent::new(
                "structured_attempt",
                json!({
                    "output": name,
                    "attempt": attempt,
                    "max_attempts": max_attempts,
                    "messages": request.len(),
                }),
            ));

            let reply = self.complete(&request, cancellation_token).await?;

            match extract_structured::<T>(&reply, ctx) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!("Failed to parse {} on attempt {}: {}", name, attempt, error);
                    self.conversation_logger.log(ConversationEvent::new(
                        "structured_parse_failed",
                        json!({
                            "output": name,
                            "attempt": attempt,
                            "error": error.to_string(),
                            "response": reply,
                        }),
                    ));
                    last_error = Some(error);
                }
            }
        }

        Err(OrchestratorError::RetryExhausted {
            schema: name,
            attempts: max_attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts were made".to_string()),
        })
    }

    /// One completion, raced against cancellation
    async fn complete(
        &self,
        messages: &[LlmMessage],
        cancellation_token: Option<&CancellationToken>,
    ) -> Result<String, OrchestratorError> {
        match cancellation_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(OrchestratorError::Cancelled),
                reply = self.backend.complete(messages) => Ok(reply?),
            },
            None => Ok(self.backend.complete(messages).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_backend::{BackendError, ModelCapabilities};
    use async_trait::async_trait;
    use hypoloop_domain::{ContentPart, FactSheet, ImageData, MessageContent, Role};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ==================== Test Mocks ====================

    struct ScriptedBackend {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<Vec<LlmMessage>>>,
        vision: bool,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                requests: Mutex::new(Vec::new()),
                vision: true,
            }
        }

        fn text_only(mut self) -> Self {
            self.vision = false;
            self
        }

        fn requests(&self) -> Vec<Vec<LlmMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        async fn complete(&self, messages: &[LlmMessage]) -> Result<String, BackendError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BackendError::Other("No more replies".to_string()))
        }

        fn capabilities(&self) -> ModelCapabilities {
            ModelCapabilities {
                vision: self.vision,
            }
        }
    }

    const VALID: &str =
        "The question states two sums.\n```json\n{\"facts\": [{\"content\": \"33 + 22\", \"source\": \"question\"}]}\n```";

    fn conversation() -> Vec<LlmMessage> {
        vec![LlmMessage::user("Orchestrator", "Build the fact sheet.")]
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let backend = Arc::new(ScriptedBackend::new(vec![VALID]));
        let coordinator = RetryCoordinator::new(backend.clone());

        let sheet: FactSheet = coordinator
            .produce(&conversation(), &(), 3, None)
            .await
            .unwrap();

        assert_eq!(sheet.len(), 1);
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 2);
        assert!(requests[0][1].text().contains("Response Output Format"));
        assert!(requests[0][1].text().contains("\"facts\""));
    }

    #[tokio::test]
    async fn test_missing_block_retried_with_one_corrective_message() {
        let backend = Arc::new(ScriptedBackend::new(vec!["The answer is 55.", VALID]));
        let coordinator = RetryCoordinator::new(backend.clone());

        let sheet: FactSheet = coordinator
            .produce(&conversation(), &(), 3, None)
            .await
            .unwrap();
        assert_eq!(sheet.len(), 1);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), requests[0].len() + 1);
        assert_eq!(&requests[1][..requests[0].len()], &requests[0][..]);
        let corrective = requests[1].last().unwrap();
        assert_eq!(corrective.role, Role::User);
        assert!(corrective.text().contains("no structured block found"));
    }

    #[tokio::test]
    async fn test_never_valid_exhausts_exactly_max_attempts() {
        let backend = Arc::new(ScriptedBackend::new(vec!["nope"; 5]));
        let coordinator = RetryCoordinator::new(backend.clone());

        let err = coordinator
            .produce::<FactSheet>(&conversation(), &(), 3, None)
            .await
            .unwrap_err();

        match err {
            OrchestratorError::RetryExhausted {
                schema,
                attempts,
                last_error,
            } => {
                assert_eq!(schema, "FactSheet");
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "no structured block found");
            }
            other => panic!("unexpected error: {other}"),
        }

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        // Corrective messages never pile up
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[2].len(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::new(vec![VALID]));
        let coordinator = RetryCoordinator::new(backend.clone());

        let err = coordinator
            .produce::<FactSheet>(&conversation(), &(), 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::RetryExhausted { attempts: 0, .. }));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let coordinator = RetryCoordinator::new(backend.clone());

        let err = coordinator
            .produce::<FactSheet>(&conversation(), &(), 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Backend(_)));
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let backend = Arc::new(ScriptedBackend::new(vec![VALID]));
        let coordinator = RetryCoordinator::new(backend.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = coordinator
            .produce::<FactSheet>(&conversation(), &(), 3, Some(&token))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_images_stripped_for_text_only_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![VALID]).text_only());
        let coordinator = RetryCoordinator::new(backend.clone());
        let conversation = vec![LlmMessage::user(
            "user",
            MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "Is this grass?".to_string(),
                },
                ContentPart::Image {
                    image: ImageData {
                        media_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    },
                },
            ]),
        )];

        let _: FactSheet = coordinator
            .produce(&conversation, &(), 1, None)
            .await
            .unwrap();

        let requests = backend.requests();
        assert!(!requests[0][0].content.has_images());
        assert!(requests[0][0].text().contains("<image>"));
    }
}
