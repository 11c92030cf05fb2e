//! Top-level results/chat orchestrator.
//!
//! ```text
//! intro -> loading -> quiz -> generating_results -> results -> intro
//! intro <-> chat
//! ```
//!
//! [`VibeStage::transition`] never performs I/O. Work that needs the model
//! is returned as [`Effect`]s, and its outcome comes back as another
//! [`StageEvent`].

use super::chat::ChatSession;
use super::quiz::{QuizEvent, QuizState};
use super::schema::{MusicChatInput, MusicChatOutput, SoundtrackGenerationInput, SoundtrackGenerationOutput};
use super::TransitionError;
use serde::Serialize;

pub const SOUNDTRACK_FAILED: &str =
    "Oh no! Our vibe-o-meter is a bit fuzzy. Couldn't generate your soundtrack. Please try again!";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultsOutcome {
    Soundtrack { soundtrack: SoundtrackGenerationOutput },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum VibeStage {
    #[default]
    Intro,
    Loading,
    Quiz {
        quiz: QuizState,
    },
    GeneratingResults {
        input: SoundtrackGenerationInput,
    },
    Results {
        outcome: ResultsOutcome,
    },
    Chat {
        chat: ChatSession,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    StartQuiz,
    QuizMounted,
    Quiz(QuizEvent),
    SoundtrackReady(SoundtrackGenerationOutput),
    SoundtrackFailed,
    Retake,
    Reload,
    StartChat,
    ExitChat,
    ChatSend(String),
    /// `None` when the recommendation call failed.
    ChatReply(Option<MusicChatOutput>),
}

impl StageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StageEvent::StartQuiz => "start the quiz",
            StageEvent::QuizMounted => "mount the quiz",
            StageEvent::Quiz(event) => event.name(),
            StageEvent::SoundtrackReady(_) => "show a soundtrack",
            StageEvent::SoundtrackFailed => "show a soundtrack failure",
            StageEvent::Retake => "retake",
            StageEvent::Reload => "reload",
            StageEvent::StartChat => "start chat",
            StageEvent::ExitChat => "exit chat",
            StageEvent::ChatSend(_) => "send a chat message",
            StageEvent::ChatReply(_) => "receive a chat reply",
        }
    }

    /// Whether accepting this event abandons any model call still in flight.
    pub fn leaves_stage(&self) -> bool {
        matches!(
            self,
            StageEvent::Retake | StageEvent::Reload | StageEvent::StartChat | StageEvent::ExitChat
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Follow up with [`StageEvent::QuizMounted`].
    MountQuiz,
    FetchQuizQuestions,
    GenerateSoundtrack(SoundtrackGenerationInput),
    RequestRecommendation(MusicChatInput),
    StopAmbientAudio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub stage: VibeStage,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(stage: VibeStage) -> Self {
        Self {
            stage,
            effects: Vec::new(),
        }
    }

    fn with(stage: VibeStage, effect: Effect) -> Self {
        Self {
            stage,
            effects: vec![effect],
        }
    }
}

impl VibeStage {
    pub fn name(&self) -> &'static str {
        match self {
            VibeStage::Intro => "intro",
            VibeStage::Loading => "loading",
            VibeStage::Quiz { .. } => "quiz",
            VibeStage::GeneratingResults { .. } => "generating_results",
            VibeStage::Results { .. } => "results",
            VibeStage::Chat { .. } => "chat",
        }
    }

    pub fn transition(&self, event: StageEvent) -> Result<Transition, TransitionError> {
        use StageEvent as E;
        use VibeStage as S;

        match (self, event) {
            (_, E::Reload) => Ok(Transition::with(S::Intro, Effect::StopAmbientAudio)),

            (S::Intro, E::StartQuiz) => Ok(Transition::with(S::Loading, Effect::MountQuiz)),
            (S::Loading, E::QuizMounted) => Ok(Transition::with(
                S::Quiz {
                    quiz: QuizState::Loading,
                },
                Effect::FetchQuizQuestions,
            )),
            (S::Quiz { quiz }, E::Quiz(event)) => match quiz.transition(event)? {
                QuizState::Complete { selections } => {
                    let input = selections.to_generation_input();
                    Ok(Transition::with(
                        S::GeneratingResults {
                            input: input.clone(),
                        },
                        Effect::GenerateSoundtrack(input),
                    ))
                }
                quiz => Ok(Transition::to(S::Quiz { quiz })),
            },

            (S::GeneratingResults { .. }, E::SoundtrackReady(soundtrack)) => {
                Ok(Transition::to(S::Results {
                    outcome: ResultsOutcome::Soundtrack { soundtrack },
                }))
            }
            (S::GeneratingResults { .. }, E::SoundtrackFailed) => Ok(Transition::to(S::Results {
                outcome: ResultsOutcome::Failed {
                    message: SOUNDTRACK_FAILED.to_string(),
                },
            })),
            (S::Results { .. }, E::Retake) => {
                Ok(Transition::with(S::Intro, Effect::StopAmbientAudio))
            }

            (S::Intro, E::StartChat) => Ok(Transition::to(S::Chat {
                chat: ChatSession::new(),
            })),
            (S::Chat { .. }, E::ExitChat) => Ok(Transition::to(S::Intro)),
            (S::Chat { chat }, E::ChatSend(text)) => {
                let (chat, input) = chat.begin_send(&text)?;
                Ok(Transition::with(
                    S::Chat { chat },
                    Effect::RequestRecommendation(input),
                ))
            }
            (S::Chat { chat }, E::ChatReply(reply)) => Ok(Transition::to(S::Chat {
                chat: chat.complete_send(reply)?,
            })),

            (stage, event) => Err(TransitionError::invalid(event.name(), stage.name())),
        }
    }
}
