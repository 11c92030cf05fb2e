//! Scripted LLM provider for end-to-end tests
//!
//! Replies are queued by the test and handed out in order. A reply can be
//! held back behind a gate so a test can act while the model call is still
//! in flight.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use vibetune_server::agent::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
};

struct ScriptedReply {
    reply: Result<String, LlmError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Releases a gated reply when opened (or dropped).
pub struct ReplyGate(oneshot::Sender<()>);

impl ReplyGate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful reply with the given raw model output.
    pub fn push_reply(&self, raw: &str) {
        self.push(Ok(raw.to_string()), None);
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: LlmError) {
        self.push(Err(error), None);
    }

    /// Queue a reply that is only returned once the gate is opened.
    pub fn push_gated_reply(&self, raw: &str) -> ReplyGate {
        let (tx, rx) = oneshot::channel();
        self.push(Ok(raw.to_string()), Some(rx));
        ReplyGate(tx)
    }

    fn push(&self, reply: Result<String, LlmError>, gate: Option<oneshot::Receiver<()>>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply { reply, gate });
    }

    /// Every request received so far, as the list of messages sent.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    /// Content of the user message of the `index`-th request.
    pub fn user_prompt(&self, index: usize) -> String {
        self.calls()[index]
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    /// Wait until `count` requests have reached the provider.
    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..200 {
            if self.calls.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Expected {} model calls, got {}", count, self.calls().len());
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-e2e"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let next = self.replies.lock().unwrap().pop_front();
        let Some(ScriptedReply { reply, gate }) = next else {
            return Err(LlmError::Connection("no scripted reply left".to_string()));
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        Ok(CompletionResponse {
            message: Message::assistant(reply?),
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}
