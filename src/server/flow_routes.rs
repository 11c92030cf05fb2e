//! Stateless flow endpoints. Each request performs exactly one model call.

use crate::vibe::schema::{
    GenerateQuizContentInput, GenerateQuizContentOutput, MusicChatInput, MusicChatOutput,
    SoundtrackGenerationInput, SoundtrackGenerationOutput,
};
use crate::vibe::VibeFlows;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use super::api_error::ApiError;
use super::state::ServerState;

async fn quiz_content(
    State(flows): State<VibeFlows>,
    body: Result<Json<GenerateQuizContentInput>, JsonRejection>,
) -> Result<Json<GenerateQuizContentOutput>, ApiError> {
    let Json(input) = body?;
    Ok(Json(flows.generate_quiz_content(&input).await?))
}

async fn soundtrack(
    State(flows): State<VibeFlows>,
    body: Result<Json<SoundtrackGenerationInput>, JsonRejection>,
) -> Result<Json<SoundtrackGenerationOutput>, ApiError> {
    let Json(input) = body?;
    Ok(Json(flows.generate_soundtrack(&input).await?))
}

async fn music_chat(
    State(flows): State<VibeFlows>,
    body: Result<Json<MusicChatInput>, JsonRejection>,
) -> Result<Json<MusicChatOutput>, ApiError> {
    let Json(input) = body?;
    Ok(Json(flows.music_recommendation(&input).await?))
}

pub fn make_flow_routes(state: ServerState) -> Router {
    Router::new()
        .route("/quiz-content", post(quiz_content))
        .route("/soundtrack", post(soundtrack))
        .route("/music-chat", post(music_chat))
        .with_state(state)
}
