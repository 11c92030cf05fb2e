use super::schema::{SoundtrackGenerationOutput, VibeDimensions};
use serde::Serialize;

const SPOTIFY_SEARCH_URL: &str = "https://open.spotify.com/search/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VibeChartRow {
    pub subject: &'static str,
    pub score: u8,
    pub full_mark: u8,
}

/// Everything a client needs to show and share a soundtrack result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareCard {
    pub share_text: String,
    pub spotify_search_url: String,
    pub vibe_chart: Vec<VibeChartRow>,
}

impl ShareCard {
    pub fn new(soundtrack: &SoundtrackGenerationOutput, public_url: Option<&str>) -> Self {
        Self {
            share_text: share_text(soundtrack, public_url),
            spotify_search_url: spotify_search_url(soundtrack),
            vibe_chart: soundtrack
                .vibe_dimensions
                .as_ref()
                .map(vibe_chart)
                .unwrap_or_default(),
        }
    }
}

fn share_text(soundtrack: &SoundtrackGenerationOutput, public_url: Option<&str>) -> String {
    let mut headline = format!("My VibeTune is: {}!", soundtrack.soundtrack_title);
    if let Some(emoji) = soundtrack.emoji_tone.as_deref().filter(|e| !e.is_empty()) {
        headline.push(' ');
        headline.push_str(emoji);
    }

    let mut lines = vec![
        headline,
        soundtrack.soundtrack_description.clone(),
        format!("My Spotify playlist theme: {}", soundtrack.spotify_playlist_theme),
    ];
    if let Some(url) = public_url {
        lines.push(format!("Find your vibe: {}", url));
    }
    lines.join("\n")
}

fn spotify_search_url(soundtrack: &SoundtrackGenerationOutput) -> String {
    let mut query = soundtrack.spotify_playlist_theme.clone();
    for song in &soundtrack.suggested_songs {
        query.push(' ');
        query.push_str(song);
    }
    format!("{}{}", SPOTIFY_SEARCH_URL, urlencoding::encode(&query))
}

fn vibe_chart(dimensions: &VibeDimensions) -> Vec<VibeChartRow> {
    dimensions
        .rows()
        .into_iter()
        .map(|(subject, score)| VibeChartRow {
            subject,
            score,
            full_mark: VibeDimensions::MAX_SCORE,
        })
        .collect()
}
