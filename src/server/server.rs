use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::vibe::{SessionStore, VibeFlows};

use super::flow_routes::make_flow_routes;
use super::session_routes::make_session_routes;
use super::{log_requests, metrics, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub live_sessions: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        llm_provider: state.flows.provider_name().to_string(),
        llm_model: state.flows.model().to_string(),
        live_sessions: state.sessions().len(),
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, flows: VibeFlows, sessions: Arc<SessionStore>) -> Router {
    let state = ServerState::new(config.clone(), flows, sessions);

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/v1/flows", make_flow_routes(state.clone()))
        .nest("/v1/sessions", make_session_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    flows: VibeFlows,
    sessions: Arc<SessionStore>,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, flows, sessions);

    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            tracing::error!("Metrics server stopped: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::CompletionOptions;
    use crate::vibe::testing::ScriptedProvider;
    use crate::vibe::SessionSettings;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app(provider: Arc<ScriptedProvider>) -> Router {
        make_app(
            ServerConfig::default(),
            VibeFlows::new(provider, CompletionOptions::default()),
            Arc::new(SessionStore::new(SessionSettings::default())),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 01:01:01");
    }

    #[tokio::test]
    async fn home_reports_provider_and_sessions() {
        let response = app(ScriptedProvider::with_replies([]))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["llm_provider"], "scripted");
        assert_eq!(json["llm_model"], "scripted-model");
        assert_eq!(json["live_sessions"], 0);
    }

    #[tokio::test]
    async fn unknown_session_routes_return_not_found() {
        let app = app(ScriptedProvider::with_replies([]));
        let routes = [
            ("GET", format!("/v1/sessions/{}", uuid::Uuid::new_v4())),
            ("POST", format!("/v1/sessions/{}/quiz/start", uuid::Uuid::new_v4())),
            ("POST", "/v1/sessions/not-a-uuid/retake".to_string()),
        ];

        for (method, uri) in routes {
            let request = Request::builder()
                .method(method)
                .uri(&uri)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
            assert_eq!(body_json(response).await["kind"], "not_found");
        }
    }

    #[tokio::test]
    async fn malformed_flow_body_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/flows/soundtrack")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"energyLevel": 3}"#))
            .unwrap();
        let response = app(ScriptedProvider::with_replies([]))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "invalid_input");
    }
}
