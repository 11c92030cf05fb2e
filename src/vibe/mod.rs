//! The VibeTune core: prompt contracts, model flows and the quiz, results
//! and chat orchestrators.
//!
//! Orchestrators are pure `(state, event) -> state` machines. Model calls are
//! described as [`stage::Effect`] values and carried out by the
//! [`driver::VibeDriver`], which feeds the outcome back as another event.

pub mod audio;
pub mod chat;
pub mod driver;
pub mod flows;
pub mod prompts;
pub mod quiz;
pub mod schema;
pub mod session;
pub mod share;
pub mod stage;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use audio::{AmbientAudio, LoopingAudioState};
pub use chat::ChatSession;
pub use driver::{DriverError, VibeDriver};
pub use flows::{FlowError, VibeFlows};
pub use quiz::{QuizEvent, QuizState, UserSelections};
pub use session::{SessionSettings, SessionSnapshot, SessionStore};
pub use share::ShareCard;
pub use stage::{Effect, StageEvent, VibeStage};

/// An event that the current state does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {event} while {state}")]
    Invalid {
        event: &'static str,
        state: &'static str,
    },

    #[error("'{0}' is not one of the current question's options")]
    UnknownOption(String),

    #[error("Chat message must not be empty")]
    EmptyMessage,

    #[error("A chat reply is still pending")]
    Busy,
}

impl TransitionError {
    pub fn invalid(event: &'static str, state: &'static str) -> Self {
        TransitionError::Invalid { event, state }
    }
}
