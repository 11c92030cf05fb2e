//! Vibe session routes.
//!
//! Every mutating route feeds one [`StageEvent`] to the driver and answers
//! with the resulting snapshot. Model failures surface as display states in
//! that snapshot, never as HTTP errors.

use crate::vibe::{QuizEvent, SessionSnapshot, StageEvent, VibeDriver};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::api_error::ApiError;
use super::state::{GuardedSessionStore, ServerState};

type SessionPath = Result<Path<Uuid>, PathRejection>;
type SnapshotResult = Result<Json<SessionSnapshot>, ApiError>;

#[derive(Deserialize, Debug)]
struct AnswerBody {
    pub option: String,
}

#[derive(Deserialize, Debug)]
struct ChatMessageBody {
    pub message: String,
}

#[derive(Deserialize, Debug)]
struct AudioToggleBody {
    pub src: String,
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("Vibe session {} not found", id),
    )
}

async fn dispatch(driver: &VibeDriver, path: SessionPath, event: StageEvent) -> SnapshotResult {
    let Path(id) = path?;
    Ok(Json(driver.dispatch(id, event).await?))
}

async fn create_session(State(sessions): State<GuardedSessionStore>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(sessions.create()))
}

async fn get_session(State(sessions): State<GuardedSessionStore>, path: SessionPath) -> SnapshotResult {
    let Path(id) = path?;
    sessions.snapshot(id).map(Json).ok_or_else(|| not_found(id))
}

async fn delete_session(
    State(sessions): State<GuardedSessionStore>,
    path: SessionPath,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if sessions.remove(id) {
        debug!(session = %id, "Deleted vibe session");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

async fn start_quiz(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::StartQuiz).await
}

async fn answer_question(
    State(driver): State<VibeDriver>,
    path: SessionPath,
    body: Result<Json<AnswerBody>, JsonRejection>,
) -> SnapshotResult {
    let Json(body) = body?;
    dispatch(&driver, path, StageEvent::Quiz(QuizEvent::Answer(body.option))).await
}

async fn skip_question(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::Quiz(QuizEvent::Skip)).await
}

async fn retake(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::Retake).await
}

async fn reload(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::Reload).await
}

async fn start_chat(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::StartChat).await
}

async fn send_chat_message(
    State(driver): State<VibeDriver>,
    path: SessionPath,
    body: Result<Json<ChatMessageBody>, JsonRejection>,
) -> SnapshotResult {
    let Json(body) = body?;
    dispatch(&driver, path, StageEvent::ChatSend(body.message)).await
}

async fn exit_chat(State(driver): State<VibeDriver>, path: SessionPath) -> SnapshotResult {
    dispatch(&driver, path, StageEvent::ExitChat).await
}

async fn toggle_audio(
    State(sessions): State<GuardedSessionStore>,
    path: SessionPath,
    body: Result<Json<AudioToggleBody>, JsonRejection>,
) -> SnapshotResult {
    let Path(id) = path?;
    let Json(body) = body?;
    if body.src.trim().is_empty() {
        return Err(ApiError::invalid_input("Audio src must not be empty"));
    }

    sessions
        .with_session(id, |session| session.audio.toggle_loop(&body.src))
        .ok_or_else(|| not_found(id))?;
    sessions.snapshot(id).map(Json).ok_or_else(|| not_found(id))
}

async fn stop_audio(State(sessions): State<GuardedSessionStore>, path: SessionPath) -> SnapshotResult {
    let Path(id) = path?;
    sessions
        .with_session(id, |session| session.audio.stop_loop())
        .ok_or_else(|| not_found(id))?;
    sessions.snapshot(id).map(Json).ok_or_else(|| not_found(id))
}

pub fn make_session_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/quiz/start", post(start_quiz))
        .route("/{id}/quiz/answer", post(answer_question))
        .route("/{id}/quiz/skip", post(skip_question))
        .route("/{id}/retake", post(retake))
        .route("/{id}/reload", post(reload))
        .route("/{id}/chat/start", post(start_chat))
        .route("/{id}/chat/message", post(send_chat_message))
        .route("/{id}/chat/exit", post(exit_chat))
        .route("/{id}/audio/toggle", post(toggle_audio))
        .route("/{id}/audio/stop", post(stop_audio))
        .with_state(state)
}
