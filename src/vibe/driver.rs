//! Runs stage events against a session and carries out their effects.

use super::flows::{Flow, MusicChatFlow, QuizContentFlow, SoundtrackFlow, VibeFlows};
use super::prompts::QUIZ_REQUEST_PROMPT;
use super::quiz::QuizEvent;
use super::schema::GenerateQuizContentInput;
use super::session::{SessionSnapshot, SessionStore, Stale};
use super::stage::{Effect, StageEvent};
use super::TransitionError;
use crate::server::metrics;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("Vibe session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Clone)]
pub struct VibeDriver {
    sessions: Arc<SessionStore>,
    flows: VibeFlows,
}

impl VibeDriver {
    pub fn new(sessions: Arc<SessionStore>, flows: VibeFlows) -> Self {
        Self { sessions, flows }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Apply `event` and every follow-up it triggers, then return the
    /// resulting snapshot.
    ///
    /// The session lock is never held across a model call. If the session
    /// leaves its stage while a call is in flight, the late result is dropped.
    /// Effects run on their own task, so a caller that goes away does not
    /// cancel the model call or leave the session waiting for its outcome.
    pub async fn dispatch(
        &self,
        id: Uuid,
        event: StageEvent,
    ) -> Result<SessionSnapshot, DriverError> {
        let (epoch, effects) = self
            .sessions
            .with_session(id, |session| {
                session.apply(event).map(|effects| (session.epoch, effects))
            })
            .ok_or(DriverError::SessionNotFound(id))??;

        if !effects.is_empty() {
            let driver = self.clone();
            let task =
                tokio::spawn(async move { driver.run_effects(id, epoch, effects).await });
            if let Err(e) = task.await {
                error!(session = %id, error = %e, "Effect task failed");
            }
        }

        self.sessions
            .snapshot(id)
            .ok_or(DriverError::SessionNotFound(id))
    }

    async fn run_effects(&self, id: Uuid, epoch: u64, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);

        while let Some(effect) = queue.pop_front() {
            let Some((source, followup)) = self.perform(effect).await else {
                continue;
            };

            match self.sessions.apply_if_current(id, epoch, followup) {
                Ok(Ok(more)) => queue.extend(more),
                Ok(Err(e)) => {
                    warn!(session = %id, source, error = %e, "Follow-up event rejected");
                }
                Err(stale) => {
                    debug!(session = %id, source, reason = ?stale, "Discarding stale result");
                    if stale == Stale::Superseded {
                        metrics::record_stale_result(source);
                    }
                }
            }
        }
    }

    /// Carry out one effect, producing the event that reports its outcome.
    async fn perform(&self, effect: Effect) -> Option<(&'static str, StageEvent)> {
        match effect {
            Effect::MountQuiz => Some(("mount", StageEvent::QuizMounted)),
            Effect::FetchQuizQuestions => {
                let input = GenerateQuizContentInput {
                    prompt: QUIZ_REQUEST_PROMPT.to_string(),
                };
                let event = match self.flows.generate_quiz_content(&input).await {
                    Ok(output) => QuizEvent::QuestionsLoaded(output.questions),
                    Err(_) => QuizEvent::LoadFailed,
                };
                Some((QuizContentFlow::NAME, StageEvent::Quiz(event)))
            }
            Effect::GenerateSoundtrack(input) => {
                let event = match self.flows.generate_soundtrack(&input).await {
                    Ok(output) => StageEvent::SoundtrackReady(output),
                    Err(_) => StageEvent::SoundtrackFailed,
                };
                Some((SoundtrackFlow::NAME, event))
            }
            Effect::RequestRecommendation(input) => {
                let reply = self.flows.music_recommendation(&input).await.ok();
                Some((MusicChatFlow::NAME, StageEvent::ChatReply(reply)))
            }
            // Applied by the session itself.
            Effect::StopAmbientAudio => None,
        }
    }
}
