//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, SIX_QUESTIONS_REPLY};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_start_quiz() {
//!     let server = TestServer::spawn().await;
//!     server.llm.push_reply(SIX_QUESTIONS_REPLY);
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let id = client.create_session_id().await;
//!     let response = client.start_quiz(&id).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod scripted_llm;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use scripted_llm::ScriptedLlm;
pub use server::TestServer;
