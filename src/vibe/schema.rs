//! Structured contracts for the three model-backed operations.
//!
//! Every model response goes through [`parse_structured`]: it has to
//! deserialize into the typed record and then pass [`Validate`], otherwise
//! the caller gets a [`SchemaError`]. Nothing here synthesizes defaults for
//! a malformed response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Model output (or flow input) that does not match its contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct SchemaError {
    /// JSON-path-like location of the offending field (`$` for the whole document).
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Structural checks that serde alone cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

/// A record the model is asked to produce.
pub trait StructuredOutput: DeserializeOwned + Validate {
    /// JSON schema embedded in the instructions sent to the model.
    fn json_schema() -> Value;
}

fn require_text(path: impl Into<String>, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        Err(SchemaError::new(path, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Parse raw model text into a validated record.
///
/// Surrounding whitespace and a Markdown code fence are tolerated, anything
/// else has to be exactly the expected JSON object.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, SchemaError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(SchemaError::new("$", "model returned an empty response"));
    }
    let parsed: T =
        serde_json::from_str(body).map_err(|e| SchemaError::new("$", e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Language tag such as `json`, on its own line or glued to the body.
    rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim()
}

// ============================================================================
// Quiz categories
// ============================================================================

/// The six aspects of a vibe the quiz asks about, in question order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuizAnswerCategory {
    EnergyLevel,
    EmotionalState,
    SocialVibes,
    InnerMonologue,
    AestheticPreference,
    MovieSceneSoundtrack,
}

impl QuizAnswerCategory {
    /// Question order.
    pub const ALL: [QuizAnswerCategory; 6] = [
        QuizAnswerCategory::EnergyLevel,
        QuizAnswerCategory::EmotionalState,
        QuizAnswerCategory::SocialVibes,
        QuizAnswerCategory::InnerMonologue,
        QuizAnswerCategory::AestheticPreference,
        QuizAnswerCategory::MovieSceneSoundtrack,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            QuizAnswerCategory::EnergyLevel => "energyLevel",
            QuizAnswerCategory::EmotionalState => "emotionalState",
            QuizAnswerCategory::SocialVibes => "socialVibes",
            QuizAnswerCategory::InnerMonologue => "innerMonologue",
            QuizAnswerCategory::AestheticPreference => "aestheticPreference",
            QuizAnswerCategory::MovieSceneSoundtrack => "movieSceneSoundtrack",
        }
    }

    /// Label used in the soundtrack prompt.
    pub fn label(&self) -> &'static str {
        match self {
            QuizAnswerCategory::EnergyLevel => "Energy Level",
            QuizAnswerCategory::EmotionalState => "Emotional State",
            QuizAnswerCategory::SocialVibes => "Social Vibes",
            QuizAnswerCategory::InnerMonologue => "Inner Monologue",
            QuizAnswerCategory::AestheticPreference => "Aesthetic Preference",
            QuizAnswerCategory::MovieSceneSoundtrack => "Movie Scene Soundtrack",
        }
    }

    /// Value submitted when the category never got an answer.
    pub fn neutral_default(&self) -> &'static str {
        match self {
            QuizAnswerCategory::EnergyLevel => "neutral",
            QuizAnswerCategory::EmotionalState => "calm",
            QuizAnswerCategory::SocialVibes => "balanced",
            QuizAnswerCategory::InnerMonologue => "quiet",
            QuizAnswerCategory::AestheticPreference => "minimalist",
            QuizAnswerCategory::MovieSceneSoundtrack => "ambient",
        }
    }
}

impl fmt::Display for QuizAnswerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Operation A: quiz content generation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQuizContentInput {
    pub prompt: String,
}

impl Validate for GenerateQuizContentInput {
    fn validate(&self) -> Result<(), SchemaError> {
        require_text("prompt", &self.prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
}

/// Count and order are not checked here; the quiz orchestrator owns those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQuizContentOutput {
    pub questions: Vec<GeneratedQuestion>,
}

impl Validate for GenerateQuizContentOutput {
    fn validate(&self) -> Result<(), SchemaError> {
        for (i, q) in self.questions.iter().enumerate() {
            require_text(format!("questions[{}].question", i), &q.question)?;
            if q.options.is_empty() {
                return Err(SchemaError::new(
                    format!("questions[{}].options", i),
                    "must contain at least one option",
                ));
            }
            for (j, option) in q.options.iter().enumerate() {
                require_text(format!("questions[{}].options[{}]", i, j), option)?;
            }
        }
        Ok(())
    }
}

impl StructuredOutput for GenerateQuizContentOutput {
    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "description": "The generated quiz questions and answers.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string", "description": "The quiz question."},
                            "options": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "The possible answer options for the question."
                            }
                        },
                        "required": ["question", "options"]
                    }
                }
            },
            "required": ["questions"]
        })
    }
}

// ============================================================================
// Operation B: soundtrack generation
// ============================================================================

/// Fully populated quiz answers, one per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundtrackGenerationInput {
    pub energy_level: String,
    pub emotional_state: String,
    pub social_vibes: String,
    pub inner_monologue: String,
    pub aesthetic_preference: String,
    pub movie_scene_soundtrack: String,
}

impl SoundtrackGenerationInput {
    pub fn get(&self, category: QuizAnswerCategory) -> &str {
        match category {
            QuizAnswerCategory::EnergyLevel => &self.energy_level,
            QuizAnswerCategory::EmotionalState => &self.emotional_state,
            QuizAnswerCategory::SocialVibes => &self.social_vibes,
            QuizAnswerCategory::InnerMonologue => &self.inner_monologue,
            QuizAnswerCategory::AestheticPreference => &self.aesthetic_preference,
            QuizAnswerCategory::MovieSceneSoundtrack => &self.movie_scene_soundtrack,
        }
    }

    /// Build from a lookup, substituting the neutral default for anything
    /// missing or blank.
    pub fn from_lookup<'a>(lookup: impl Fn(QuizAnswerCategory) -> Option<&'a str>) -> Self {
        let value = |category: QuizAnswerCategory| {
            lookup(category)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| category.neutral_default())
                .to_string()
        };
        Self {
            energy_level: value(QuizAnswerCategory::EnergyLevel),
            emotional_state: value(QuizAnswerCategory::EmotionalState),
            social_vibes: value(QuizAnswerCategory::SocialVibes),
            inner_monologue: value(QuizAnswerCategory::InnerMonologue),
            aesthetic_preference: value(QuizAnswerCategory::AestheticPreference),
            movie_scene_soundtrack: value(QuizAnswerCategory::MovieSceneSoundtrack),
        }
    }
}

impl Validate for SoundtrackGenerationInput {
    fn validate(&self) -> Result<(), SchemaError> {
        for category in QuizAnswerCategory::ALL {
            require_text(category.key(), self.get(category))?;
        }
        Ok(())
    }
}

/// Five 0-100 scores summarizing a soundtrack's character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibeDimensions {
    #[serde(deserialize_with = "deserialize_score")]
    pub energy: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub focus: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub creativity: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub social: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub emotion: u8,
}

impl VibeDimensions {
    pub const MAX_SCORE: u8 = 100;

    /// Scores in display order.
    pub fn rows(&self) -> [(&'static str, u8); 5] {
        [
            ("Energy", self.energy),
            ("Focus", self.focus),
            ("Creativity", self.creativity),
            ("Social", self.social),
            ("Emotion", self.emotion),
        ]
    }
}

fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || !(0.0..=f64::from(VibeDimensions::MAX_SCORE)).contains(&raw) {
        return Err(serde::de::Error::custom(format!(
            "score {} is outside [0, {}]",
            raw,
            VibeDimensions::MAX_SCORE
        )));
    }
    Ok(raw.round() as u8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundtrackGenerationOutput {
    pub soundtrack_title: String,
    pub soundtrack_description: String,
    pub spotify_playlist_theme: String,
    pub suggested_songs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe_dimensions: Option<VibeDimensions>,
}

impl Validate for SoundtrackGenerationOutput {
    fn validate(&self) -> Result<(), SchemaError> {
        // Score ranges are enforced while deserializing.
        require_text("soundtrackTitle", &self.soundtrack_title)
    }
}

impl StructuredOutput for SoundtrackGenerationOutput {
    fn json_schema() -> Value {
        let score = |description: &str| {
            json!({"type": "number", "minimum": 0, "maximum": 100, "description": description})
        };
        json!({
            "type": "object",
            "properties": {
                "soundtrackTitle": {"type": "string", "description": "A fun title for the soundtrack (e.g., Lo-fi Sad Boi)."},
                "soundtrackDescription": {"type": "string", "description": "A 2-3 sentence description of the vibe."},
                "spotifyPlaylistTheme": {"type": "string", "description": "A suggested Spotify playlist theme (e.g., rainy window vibes)."},
                "suggestedSongs": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "5 suggested songs formatted as \"Song Title - Artist Name\"."
                },
                "emojiTone": {"type": "string", "description": "Optional emoji tone."},
                "vibeDimensions": {
                    "type": "object",
                    "properties": {
                        "energy": score("How energetic (100) or calm (0) the vibe is."),
                        "focus": score("How focused (100) or dreamy (0) the vibe feels."),
                        "creativity": score("How unconventional (100) or practical (0) the vibe is."),
                        "social": score("How outgoing (100) or solitary (0) the vibe leans."),
                        "emotion": score("Intensity of the emotional tone.")
                    },
                    "required": ["energy", "focus", "creativity", "social", "emotion"]
                }
            },
            "required": ["soundtrackTitle", "soundtrackDescription", "spotifyPlaylistTheme", "suggestedSongs"]
        })
    }
}

// ============================================================================
// Operation C: chat recommendation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecommendation {
    pub song: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicChatOutput {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Vec<SongRecommendation>>,
}

impl MusicChatOutput {
    /// A reply without a playlist.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            playlist: None,
        }
    }

    pub fn has_playlist(&self) -> bool {
        self.playlist.as_ref().is_some_and(|p| !p.is_empty())
    }
}

impl Validate for MusicChatOutput {
    fn validate(&self) -> Result<(), SchemaError> {
        require_text("response", &self.response)?;
        if let Some(playlist) = &self.playlist {
            for (i, entry) in playlist.iter().enumerate() {
                require_text(format!("playlist[{}].song", i), &entry.song)?;
            }
        }
        Ok(())
    }
}

impl StructuredOutput for MusicChatOutput {
    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "response": {
                    "type": "string",
                    "description": "The chatbot's text response. A friendly message introducing the playlist if one is generated."
                },
                "playlist": {
                    "type": "array",
                    "description": "An optional playlist of 5-8 songs. Only include it if the user asks for music or seems to be looking for recommendations.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "song": {"type": "string", "description": "The title of the song."},
                            "artist": {"type": "string", "description": "The name of the artist."}
                        },
                        "required": ["song", "artist"]
                    }
                }
            },
            "required": ["response"]
        })
    }
}

/// Content of a chat turn: plain text from the user, or a structured
/// recommendation from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Recommendation(MusicChatOutput),
}

impl ChatContent {
    /// The text a reader would see for this turn.
    pub fn text(&self) -> &str {
        match self {
            ChatContent::Text(text) => text,
            ChatContent::Recommendation(output) => &output.response,
        }
    }

    pub fn has_playlist(&self) -> bool {
        matches!(self, ChatContent::Recommendation(output) if output.has_playlist())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: ChatContent,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: ChatContent::Text(text.into()),
        }
    }

    pub fn model(output: MusicChatOutput) -> Self {
        Self {
            role: ChatRole::Model,
            content: ChatContent::Recommendation(output),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicChatInput {
    pub history: Vec<ChatMessage>,
    pub message: String,
}

impl Validate for MusicChatInput {
    fn validate(&self) -> Result<(), SchemaError> {
        require_text("message", &self.message)
    }
}
