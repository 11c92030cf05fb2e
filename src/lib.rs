//! VibeTune server library
//!
//! Quiz, soundtrack and music chat orchestration over an LLM provider,
//! exposed for the binary and for the end-to-end tests.

pub mod agent;
pub mod config;
pub mod server;
pub mod vibe;

pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use vibe::{SessionSettings, SessionStore, VibeFlows};
