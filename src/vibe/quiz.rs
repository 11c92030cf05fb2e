//! Quiz orchestrator: `loading -> active(0..n) -> complete`, or `error`.

use super::schema::{GeneratedQuestion, QuizAnswerCategory, SoundtrackGenerationInput};
use super::TransitionError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of questions in a full quiz, one per category.
pub const QUIZ_LENGTH: usize = QuizAnswerCategory::ALL.len();

/// Recorded for a skipped question.
pub const SKIPPED_ANSWER: &str = "Not sure";

pub const QUIZ_GENERATION_FAILED: &str =
    "Oops! We couldn't cook up the quiz questions. Please try again later.";
pub const NO_QUESTIONS_AVAILABLE: &str =
    "No questions available at the moment. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub category: QuizAnswerCategory,
    pub question: String,
    pub options: Vec<String>,
}

/// Keep at most [`QUIZ_LENGTH`] questions and tag them with categories by
/// position. A short list leaves the trailing categories without a question.
pub fn assign_categories(generated: Vec<GeneratedQuestion>) -> Vec<QuizQuestion> {
    generated
        .into_iter()
        .zip(QuizAnswerCategory::ALL)
        .enumerate()
        .map(|(i, (q, category))| QuizQuestion {
            id: format!("q-{}", i),
            category,
            question: q.question,
            options: q.options,
        })
        .collect()
}

/// Answers recorded so far, keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserSelections(BTreeMap<QuizAnswerCategory, String>);

impl UserSelections {
    pub fn record(&mut self, category: QuizAnswerCategory, answer: impl Into<String>) {
        self.0.insert(category, answer.into());
    }

    pub fn get(&self, category: QuizAnswerCategory) -> Option<&str> {
        self.0.get(&category).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill every unanswered category with its neutral default.
    pub fn to_generation_input(&self) -> SoundtrackGenerationInput {
        SoundtrackGenerationInput::from_lookup(|category| self.get(category))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizState {
    Loading,
    Active {
        questions: Vec<QuizQuestion>,
        index: usize,
        selections: UserSelections,
    },
    Complete {
        selections: UserSelections,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    QuestionsLoaded(Vec<GeneratedQuestion>),
    LoadFailed,
    Answer(String),
    Skip,
}

impl QuizEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QuizEvent::QuestionsLoaded(_) => "load questions",
            QuizEvent::LoadFailed => "fail loading",
            QuizEvent::Answer(_) => "answer",
            QuizEvent::Skip => "skip",
        }
    }
}

impl QuizState {
    pub fn name(&self) -> &'static str {
        match self {
            QuizState::Loading => "loading",
            QuizState::Active { .. } => "active",
            QuizState::Complete { .. } => "complete",
            QuizState::Error { .. } => "error",
        }
    }

    /// The question currently on screen.
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self {
            QuizState::Active {
                questions, index, ..
            } => questions.get(*index),
            _ => None,
        }
    }

    pub fn transition(&self, event: QuizEvent) -> Result<QuizState, TransitionError> {
        match (self, event) {
            (QuizState::Loading, QuizEvent::QuestionsLoaded(generated)) => {
                let questions = assign_categories(generated);
                if questions.is_empty() {
                    return Ok(QuizState::Error {
                        message: NO_QUESTIONS_AVAILABLE.to_string(),
                    });
                }
                Ok(QuizState::Active {
                    questions,
                    index: 0,
                    selections: UserSelections::default(),
                })
            }
            (QuizState::Loading, QuizEvent::LoadFailed) => Ok(QuizState::Error {
                message: QUIZ_GENERATION_FAILED.to_string(),
            }),
            (
                QuizState::Active {
                    questions,
                    index,
                    selections,
                },
                event @ (QuizEvent::Answer(_) | QuizEvent::Skip),
            ) => {
                let Some(question) = questions.get(*index) else {
                    return Err(TransitionError::invalid(event.name(), "active"));
                };
                let answer = match event {
                    QuizEvent::Answer(option) => {
                        if !question.options.contains(&option) {
                            return Err(TransitionError::UnknownOption(option));
                        }
                        option
                    }
                    _ => SKIPPED_ANSWER.to_string(),
                };

                let mut selections = selections.clone();
                selections.record(question.category, answer);

                if index + 1 < questions.len() {
                    Ok(QuizState::Active {
                        questions: questions.clone(),
                        index: index + 1,
                        selections,
                    })
                } else {
                    Ok(QuizState::Complete { selections })
                }
            }
            (state, event) => Err(TransitionError::invalid(event.name(), state.name())),
        }
    }
}
