use axum::extract::FromRef;

use crate::vibe::{SessionStore, VibeDriver, VibeFlows};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSessionStore = Arc<SessionStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub flows: VibeFlows,
    pub driver: VibeDriver,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, flows: VibeFlows, sessions: GuardedSessionStore) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            driver: VibeDriver::new(sessions, flows.clone()),
            flows,
            hash: env!("GIT_HASH").to_string(),
        }
    }

    pub fn sessions(&self) -> &GuardedSessionStore {
        self.driver.sessions()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for VibeFlows {
    fn from_ref(input: &ServerState) -> Self {
        input.flows.clone()
    }
}

impl FromRef<ServerState> for VibeDriver {
    fn from_ref(input: &ServerState) -> Self {
        input.driver.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.driver.sessions().clone()
    }
}
