//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all vibetune-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn get_stats(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Stats request failed")
    }

    // ========================================================================
    // Flow Endpoints
    // ========================================================================

    /// POST /v1/flows/quiz-content
    pub async fn quiz_content(&self, prompt: &str) -> Response {
        self.post_json("/v1/flows/quiz-content", &json!({ "prompt": prompt }))
            .await
    }

    /// POST /v1/flows/soundtrack
    pub async fn soundtrack(&self, input: &Value) -> Response {
        self.post_json("/v1/flows/soundtrack", input).await
    }

    /// POST /v1/flows/music-chat
    pub async fn music_chat(&self, history: Value, message: &str) -> Response {
        self.post_json(
            "/v1/flows/music-chat",
            &json!({ "history": history, "message": message }),
        )
        .await
    }

    // ========================================================================
    // Vibe Session Endpoints
    // ========================================================================

    /// POST /v1/sessions
    pub async fn create_session(&self) -> Response {
        self.post_empty("/v1/sessions").await
    }

    /// Creates a session and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the server does not answer 201 with a snapshot.
    pub async fn create_session_id(&self) -> String {
        let response = self.create_session().await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let snapshot: Value = response.json().await.expect("Invalid snapshot");
        snapshot["id"]
            .as_str()
            .expect("Snapshot without id")
            .to_string()
    }

    /// GET /v1/sessions/{id}
    pub async fn get_session(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/sessions/{}", self.base_url, id))
            .send()
            .await
            .expect("Get session request failed")
    }

    /// DELETE /v1/sessions/{id}
    pub async fn delete_session(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/sessions/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete session request failed")
    }

    /// POST /v1/sessions/{id}/quiz/start
    pub async fn start_quiz(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/quiz/start", id))
            .await
    }

    /// POST /v1/sessions/{id}/quiz/answer
    pub async fn answer(&self, id: &str, option: &str) -> Response {
        self.post_json(
            &format!("/v1/sessions/{}/quiz/answer", id),
            &json!({ "option": option }),
        )
        .await
    }

    /// POST /v1/sessions/{id}/quiz/skip
    pub async fn skip(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/quiz/skip", id))
            .await
    }

    /// POST /v1/sessions/{id}/retake
    pub async fn retake(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/retake", id)).await
    }

    /// POST /v1/sessions/{id}/reload
    pub async fn reload(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/reload", id)).await
    }

    /// POST /v1/sessions/{id}/chat/start
    pub async fn start_chat(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/chat/start", id))
            .await
    }

    /// POST /v1/sessions/{id}/chat/message
    pub async fn send_chat(&self, id: &str, message: &str) -> Response {
        self.post_json(
            &format!("/v1/sessions/{}/chat/message", id),
            &json!({ "message": message }),
        )
        .await
    }

    /// POST /v1/sessions/{id}/chat/message from a client that stops waiting
    /// after `timeout`. Returns the transport error when it gives up.
    pub async fn send_chat_with_timeout(
        &self,
        id: &str,
        message: &str,
        timeout: Duration,
    ) -> reqwest::Result<Response> {
        self.client
            .post(format!("{}/v1/sessions/{}/chat/message", self.base_url, id))
            .timeout(timeout)
            .json(&json!({ "message": message }))
            .send()
            .await
    }

    /// POST /v1/sessions/{id}/chat/exit
    pub async fn exit_chat(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/chat/exit", id))
            .await
    }

    /// POST /v1/sessions/{id}/audio/toggle
    pub async fn toggle_audio(&self, id: &str, src: &str) -> Response {
        self.post_json(
            &format!("/v1/sessions/{}/audio/toggle", id),
            &json!({ "src": src }),
        )
        .await
    }

    /// POST /v1/sessions/{id}/audio/stop
    pub async fn stop_audio(&self, id: &str) -> Response {
        self.post_empty(&format!("/v1/sessions/{}/audio/stop", id))
            .await
    }
}
