//! Model invocation flows.
//!
//! Each flow validates its input, renders its prompt, makes exactly one
//! JSON-mode call to the configured [`LlmProvider`] and validates the reply.
//! There are no retries and nothing is cached.

use super::prompts;
use super::schema::{
    parse_structured, GenerateQuizContentInput, GenerateQuizContentOutput, MusicChatInput,
    MusicChatOutput, SchemaError, SoundtrackGenerationInput, SoundtrackGenerationOutput,
    StructuredOutput, Validate,
};
use crate::agent::llm::{CompletionOptions, FinishReason, LlmError, LlmProvider, Message};
use crate::server::metrics;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// A single model-backed operation: one prompt template paired with one
/// input contract and one output contract.
pub trait Flow {
    type Input: Validate + Sync;
    type Output: StructuredOutput + Send;

    /// Stable name used in logs and metrics.
    const NAME: &'static str;

    fn render_prompt(input: &Self::Input) -> String;
}

pub struct QuizContentFlow;

impl Flow for QuizContentFlow {
    type Input = GenerateQuizContentInput;
    type Output = GenerateQuizContentOutput;
    const NAME: &'static str = "quiz_content";

    fn render_prompt(input: &Self::Input) -> String {
        prompts::quiz_content_prompt(input)
    }
}

pub struct SoundtrackFlow;

impl Flow for SoundtrackFlow {
    type Input = SoundtrackGenerationInput;
    type Output = SoundtrackGenerationOutput;
    const NAME: &'static str = "soundtrack";

    fn render_prompt(input: &Self::Input) -> String {
        prompts::soundtrack_prompt(input)
    }
}

pub struct MusicChatFlow;

impl Flow for MusicChatFlow {
    type Input = MusicChatInput;
    type Output = MusicChatOutput;
    const NAME: &'static str = "music_chat";

    fn render_prompt(input: &Self::Input) -> String {
        prompts::music_chat_prompt(input)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    InvalidInput(SchemaError),

    #[error("Model output did not match the expected schema: {0}")]
    SchemaValidation(SchemaError),

    #[error("Model call failed: {0}")]
    Transport(#[from] LlmError),
}

impl FlowError {
    /// Short machine-readable label, used in metrics and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::InvalidInput(_) => "invalid_input",
            FlowError::SchemaValidation(_) => "schema_validation",
            FlowError::Transport(_) => "transport",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FlowError::Transport(LlmError::Timeout))
    }
}

/// Entry point for the three flows, sharing one provider.
#[derive(Clone)]
pub struct VibeFlows {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl VibeFlows {
    pub fn new(llm: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self { llm, options }
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub async fn generate_quiz_content(
        &self,
        input: &GenerateQuizContentInput,
    ) -> Result<GenerateQuizContentOutput, FlowError> {
        self.invoke::<QuizContentFlow>(input).await
    }

    pub async fn generate_soundtrack(
        &self,
        input: &SoundtrackGenerationInput,
    ) -> Result<SoundtrackGenerationOutput, FlowError> {
        self.invoke::<SoundtrackFlow>(input).await
    }

    pub async fn music_recommendation(
        &self,
        input: &MusicChatInput,
    ) -> Result<MusicChatOutput, FlowError> {
        self.invoke::<MusicChatFlow>(input).await
    }

    pub async fn invoke<F: Flow>(&self, input: &F::Input) -> Result<F::Output, FlowError> {
        let start = Instant::now();
        let result = self.call::<F>(input).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => {
                metrics::record_flow_invocation(F::NAME, "ok", elapsed);
                debug!(
                    flow = F::NAME,
                    model = %self.llm.model(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Flow completed"
                );
            }
            Err(e) => {
                metrics::record_flow_invocation(F::NAME, e.kind(), elapsed);
                warn!(
                    flow = F::NAME,
                    model = %self.llm.model(),
                    kind = e.kind(),
                    error = %e,
                    "Flow failed"
                );
            }
        }

        result
    }

    async fn call<F: Flow>(&self, input: &F::Input) -> Result<F::Output, FlowError> {
        input.validate().map_err(FlowError::InvalidInput)?;

        let messages = [
            Message::system(json_instructions::<F::Output>()),
            Message::user(F::render_prompt(input)),
        ];

        let response = self.llm.complete(&messages, &self.options.json()).await?;
        if response.finish_reason == FinishReason::MaxTokens {
            debug!(flow = F::NAME, "Model reply was cut off by max_tokens");
        }

        parse_structured::<F::Output>(&response.message.content)
            .map_err(FlowError::SchemaValidation)
    }
}

fn json_instructions<T: StructuredOutput>() -> String {
    let schema = serde_json::to_string_pretty(&T::json_schema()).unwrap_or_default();
    format!(
        "Respond with a single JSON object and nothing else. \
         The object must conform to this JSON schema:\n{}",
        schema
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::MessageRole;
    use crate::vibe::schema::{ChatMessage, QuizAnswerCategory};
    use crate::vibe::testing::ScriptedProvider;

    fn flows_with(provider: &Arc<ScriptedProvider>) -> VibeFlows {
        VibeFlows::new(provider.clone(), CompletionOptions::default())
    }

    #[tokio::test]
    async fn test_soundtrack_flow_sends_one_json_request() {
        let provider = ScriptedProvider::with_replies([Ok(r#"{
            "soundtrackTitle": "Neon Pulse",
            "soundtrackDescription": "...",
            "spotifyPlaylistTheme": "cyberpunk nights",
            "suggestedSongs": ["Song A - Artist A"],
            "emojiTone": "✨",
            "vibeDimensions": {"energy": 90, "focus": 40, "creativity": 70, "social": 80, "emotion": 60}
        }"#
        .to_string())]);
        let flows = flows_with(&provider);

        let input = SoundtrackGenerationInput::from_lookup(|c| match c {
            QuizAnswerCategory::EnergyLevel => Some("High"),
            _ => None,
        });
        let output = flows.generate_soundtrack(&input).await.unwrap();
        assert_eq!(output.soundtrack_title, "Neon Pulse");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("\"soundtrackTitle\""));
        assert_eq!(messages[1].role, MessageRole::User);
        assert!(messages[1].content.contains("Energy Level: High"));
        assert!(provider.json_mode_requested());
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_call() {
        let provider = ScriptedProvider::with_replies([]);
        let flows = flows_with(&provider);

        let err = flows
            .music_recommendation(&MusicChatInput {
                history: vec![ChatMessage::user("hi")],
                message: "   ".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_schema_error() {
        let provider =
            ScriptedProvider::with_replies([Ok(r#"{"questions": "not a list"}"#.to_string())]);
        let flows = flows_with(&provider);

        let err = flows
            .generate_quiz_content(&GenerateQuizContentInput {
                prompt: "a quiz".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::SchemaValidation(_)));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let provider = ScriptedProvider::with_replies([
            Err(LlmError::Timeout),
            Ok(r#"{"response": "never used"}"#.to_string()),
        ]);
        let flows = flows_with(&provider);

        let err = flows
            .music_recommendation(&MusicChatInput {
                history: vec![],
                message: "music for a rainy day".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
        assert!(err.is_timeout());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_prompt_contains_history() {
        let provider = ScriptedProvider::with_replies([Ok(
            r#"{"response": "Here's something cozy!", "playlist": [{"song": "Holocene", "artist": "Bon Iver"}]}"#
                .to_string(),
        )]);
        let flows = flows_with(&provider);

        let output = flows
            .music_recommendation(&MusicChatInput {
                history: vec![ChatMessage::user("I just woke up")],
                message: "music for a rainy day".to_string(),
            })
            .await
            .unwrap();

        assert!(output.has_playlist());
        let prompt = &provider.calls()[0][1].content;
        let earlier = prompt.find("User: I just woke up").unwrap();
        let latest = prompt.find("User: music for a rainy day").unwrap();
        assert!(earlier < latest);
    }
}
