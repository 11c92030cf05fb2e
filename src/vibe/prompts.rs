//! Prompt templates for the three flows.
//!
//! Templates use `{{name}}` placeholders. Rendering is a single pass, so text
//! interpolated into one placeholder is never re-expanded by a later one.

use super::schema::{
    ChatContent, ChatMessage, ChatRole, GenerateQuizContentInput, MusicChatInput,
    QuizAnswerCategory, SoundtrackGenerationInput,
};

/// Instruction the quiz orchestrator sends to quiz content generation.
pub const QUIZ_REQUEST_PROMPT: &str = "Generate a quiz with exactly 6 questions. \
Each question should explore one of the following aspects of a person's current vibe, in this specific order:
1. Energy level (e.g., \"How charged up are you feeling today?\")
2. Current emotional state (e.g., \"What's the main emotion painting your day?\")
3. Social vibes (e.g., \"Are you feeling more like a solo act or a group jam today?\")
4. Inner monologue (e.g., \"What's the chatter like in your head right now?\")
5. Aesthetic or fantasy preference (e.g., \"If your life was a movie genre today, what would it be?\")
6. How they'd soundtrack a movie scene about today (e.g., \"If today was a movie scene, what kind of music would be playing?\")
Each question should have 4-5 distinct options.";

const QUIZ_CONTENT_TEMPLATE: &str = "You are an expert quiz generator. \
Please generate quiz questions and answer options based on the following prompt:

Prompt: {{prompt}}

Please ensure that the questions and answers are relevant to the prompt and are engaging for the user. \
Follow the requested number of questions and options exactly.
Return an object whose \"questions\" field is an array of question objects, \
where each question object has a \"question\" field (string) and an \"options\" field (string array).";

const SOUNDTRACK_TEMPLATE: &str = "Based on the quiz responses, generate a unique soundtrack.

{{answers}}

Create a fun title (e.g., Lo-fi Sad Boi), a 2-3 sentence description of the vibe, \
and a suggested Spotify playlist theme (e.g., rainy window vibes).
Also, provide an array of 5 specific song suggestions, including artist and title \
(e.g., \"Bohemian Rhapsody - Queen\"), that perfectly fit this playlist theme. \
These songs should be actual, well-known or fitting indie songs.
Include an optional emoji tone.

Additionally, provide numerical scores (0-100) for the following vibe dimensions, reflecting the user's responses:
- Energy: How energetic (100) or calm (0) the vibe is.
- Focus: How mentally clear and focused (100) or scattered/dreamy (0) the vibe feels.
- Creativity: How imaginative and unconventional (100) or practical/conventional (0) the vibe is.
- Social: How outgoing and socially connected (100) or introverted/solitary (0) the vibe leans.
- Emotion: The intensity of the overall emotional tone (100 for very intense, 0 for very subdued/neutral).
Return these scores in a 'vibeDimensions' object with keys: 'energy', 'focus', 'creativity', 'social', 'emotion'.";

const MUSIC_CHAT_TEMPLATE: &str = "You are a friendly and knowledgeable music recommendation chatbot named VibeBot.
Your goal is to help users discover new music based on their mood, preferences, and what they are currently doing.
Keep your responses concise, friendly, and helpful.
If the user asks for music, a playlist, or specific recommendations, you should generate a playlist of 5-8 songs. \
If you generate a playlist, also provide a short, friendly text response introducing it.
If the user is just chatting, you don't need to generate a playlist; just provide a text response.

Here is the conversation history:
{{history}}

Here is the new message from the user:
User: {{message}}

Provide a helpful and engaging response as VibeBot. Create a playlist if it seems appropriate.";

const SHARED_PLAYLIST_SUFFIX: &str = " (VibeBot then shared a playlist)";

/// Substitute `{{name}}` placeholders. Unknown placeholders are left as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn quiz_content_prompt(input: &GenerateQuizContentInput) -> String {
    render(QUIZ_CONTENT_TEMPLATE, &[("prompt", &input.prompt)])
}

pub fn soundtrack_prompt(input: &SoundtrackGenerationInput) -> String {
    let answers = QuizAnswerCategory::ALL
        .iter()
        .map(|category| format!("{}: {}", category.label(), input.get(*category)))
        .collect::<Vec<_>>()
        .join("\n");
    render(SOUNDTRACK_TEMPLATE, &[("answers", &answers)])
}

pub fn music_chat_prompt(input: &MusicChatInput) -> String {
    let history = render_history(&input.history);
    render(
        MUSIC_CHAT_TEMPLATE,
        &[("history", &history), ("message", &input.message)],
    )
}

/// One line per turn, tagged by speaker.
pub fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|turn| match (turn.role, &turn.content) {
            (ChatRole::User, content) => format!("User: {}", content.text()),
            (ChatRole::Model, ChatContent::Recommendation(output)) if output.has_playlist() => {
                format!("VibeBot: {}{}", output.response, SHARED_PLAYLIST_SUFFIX)
            }
            (ChatRole::Model, content) => format!("VibeBot: {}", content.text()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
