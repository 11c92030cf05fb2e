//! Shared constants for end-to-end tests
//!
//! Canned model replies and server timing knobs. When the prompt contracts
//! change, update only this file.

// ============================================================================
// Canned Model Replies
// ============================================================================

/// A well-formed quiz with six two-option questions.
pub const SIX_QUESTIONS_REPLY: &str = r#"{"questions": [
    {"question": "How charged up are you right now?", "options": ["Fully charged", "Running on fumes"]},
    {"question": "Which feeling is loudest today?", "options": ["Giddy", "Wistful"]},
    {"question": "Party or blanket fort?", "options": ["Party", "Blanket fort"]},
    {"question": "What is your brain saying?", "options": ["Lists", "Daydreams"]},
    {"question": "Pick a movie genre for today.", "options": ["Heist", "Rom-com"]},
    {"question": "What plays over your montage?", "options": ["Synthwave", "Acoustic guitar"]}
]}"#;

/// Option answered for each question of [`SIX_QUESTIONS_REPLY`], in order.
pub const FIRST_OPTIONS: [&str; 6] = [
    "Fully charged",
    "Giddy",
    "Party",
    "Lists",
    "Heist",
    "Synthwave",
];

/// A soundtrack wrapped in a Markdown fence, as models often reply.
pub const SOUNDTRACK_REPLY: &str = r#"```json
{
    "soundtrackTitle": "Midnight Heist Groove",
    "soundtrackDescription": "Slick bass and bright synths for a day that moves fast.",
    "spotifyPlaylistTheme": "retro heist synthwave",
    "suggestedSongs": ["Nightcall - Kavinsky", "Midnight City - M83"],
    "emojiTone": "🕶️",
    "vibeDimensions": {"energy": 88, "focus": 61.6, "creativity": 74, "social": 90, "emotion": 55}
}
```"#;

pub const SOUNDTRACK_TITLE: &str = "Midnight Heist Groove";

pub const PLAYLIST_REPLY: &str = r#"{
    "response": "Rainy afternoon? Here's something mellow.",
    "playlist": [
        {"song": "Holocene", "artist": "Bon Iver"},
        {"song": "Pink + White", "artist": "Frank Ocean"}
    ]
}"#;

pub const TEXT_REPLY: &str = r#"{"response": "Tell me more about your mood!"}"#;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Public URL configured on test servers.
pub const TEST_PUBLIC_URL: &str = "https://vibetune.test";
