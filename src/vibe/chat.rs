//! Chat sub-session with VibeBot.

use super::schema::{ChatContent, ChatMessage, ChatRole, MusicChatInput, MusicChatOutput};
use super::TransitionError;
use serde::Serialize;

pub const CHAT_GREETING: &str = "Hey there! I'm VibeBot. What kind of music are you in the mood for? \
Tell me about your day, your favorite genre, or what you're doing right now.";

pub const CHAT_FAILED: &str =
    "Sorry, I'm having a little trouble connecting. Please try again in a moment.";

/// Messages of one chat visit. The first message is always the greeting,
/// which is shown to the user but not sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub pending: bool,
    pub error: Option<String>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::model(MusicChatOutput::text(CHAT_GREETING))],
            pending: false,
            error: None,
        }
    }

    /// Turns exchanged after the greeting.
    fn conversation(&self) -> &[ChatMessage] {
        self.messages.get(1..).unwrap_or_default()
    }

    /// Record a user message and build the request for it.
    ///
    /// Resubmitting the text of a user message that never got a reply reuses
    /// that message instead of appending a duplicate.
    pub fn begin_send(&self, text: &str) -> Result<(ChatSession, MusicChatInput), TransitionError> {
        if self.pending {
            return Err(TransitionError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(TransitionError::EmptyMessage);
        }

        let mut next = self.clone();
        let unanswered = matches!(
            next.messages.last(),
            Some(ChatMessage { role: ChatRole::User, content: ChatContent::Text(previous) })
                if previous == text
        );
        if !unanswered {
            next.messages.push(ChatMessage::user(text));
        }

        let conversation = next.conversation();
        let history = conversation[..conversation.len() - 1].to_vec();
        next.pending = true;
        next.error = None;

        Ok((
            next,
            MusicChatInput {
                history,
                message: text.to_string(),
            },
        ))
    }

    /// Apply the outcome of the pending request. `None` means it failed; the
    /// user message stays in place so it can be resubmitted.
    pub fn complete_send(&self, reply: Option<MusicChatOutput>) -> Result<ChatSession, TransitionError> {
        if !self.pending {
            return Err(TransitionError::invalid("receive a chat reply", "idle"));
        }

        let mut next = self.clone();
        next.pending = false;
        match reply {
            Some(output) => {
                next.messages.push(ChatMessage::model(output));
                next.error = None;
            }
            None => next.error = Some(CHAT_FAILED.to_string()),
        }
        Ok(next)
    }
}
