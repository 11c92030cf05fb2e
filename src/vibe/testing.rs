//! In-memory provider for unit tests.

use crate::agent::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    ResponseFormat,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

struct QueuedReply {
    reply: Result<String, LlmError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Replies with queued responses in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<QueuedReply>>,
    calls: Mutex<Vec<Vec<Message>>>,
    formats: Mutex<Vec<ResponseFormat>>,
}

impl ScriptedProvider {
    pub fn with_replies(
        replies: impl IntoIterator<Item = Result<String, LlmError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| QueuedReply { reply, gate: None })
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
            formats: Mutex::new(Vec::new()),
        })
    }

    pub fn push_reply(&self, reply: Result<String, LlmError>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(QueuedReply { reply, gate: None });
    }

    /// Queue a reply that is held until the returned sender fires.
    pub fn push_gated_reply(&self, reply: Result<String, LlmError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(QueuedReply {
            reply,
            gate: Some(rx),
        });
        tx
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..200 {
            if self.calls.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("Expected {} model calls, got {}", count, self.calls().len());
    }

    pub fn json_mode_requested(&self) -> bool {
        let formats = self.formats.lock().unwrap();
        !formats.is_empty() && formats.iter().all(|f| *f == ResponseFormat::JsonObject)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.formats.lock().unwrap().push(options.response_format);

        let next = self.replies.lock().unwrap().pop_front();
        let Some(QueuedReply { reply, gate }) = next else {
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
