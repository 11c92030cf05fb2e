//! Agent infrastructure for LLM-backed features.
//!
//! Currently this is the provider abstraction used by the vibe flows
//! (Ollama and OpenAI-compatible backends).

pub mod llm;

pub use llm::{
    ApiKeySource, CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message,
    MessageRole, OllamaProvider, OpenAIProvider,
};
