//! In-memory vibe sessions.
//!
//! A vibe session is one visitor's pass through intro, quiz, results and chat.
//! Sessions live only in memory and are pruned after a period of inactivity.

use super::audio::{AmbientAudio, LoopingAudioState};
use super::share::ShareCard;
use super::stage::{Effect, ResultsOutcome, StageEvent, VibeStage};
use super::TransitionError;
use crate::server::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub public_url: Option<String>,
    /// Pacing hint for clients between a quiz answer and the next question.
    pub quiz_advance_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3600),
            public_url: None,
            quiz_advance_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug)]
pub struct VibeSession {
    pub stage: VibeStage,
    pub audio: AmbientAudio,
    /// Bumped whenever the session leaves a stage, so results of model calls
    /// issued before that can be recognised and dropped.
    pub epoch: u64,
    last_active: Instant,
}

impl Default for VibeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VibeSession {
    pub fn new() -> Self {
        Self {
            stage: VibeStage::Intro,
            audio: AmbientAudio::new(),
            epoch: 0,
            last_active: Instant::now(),
        }
    }

    /// Run the stage machine and apply local effects. Returns the effects
    /// that still need the model.
    pub fn apply(&mut self, event: StageEvent) -> Result<Vec<Effect>, TransitionError> {
        let leaves_stage = event.leaves_stage();
        let transition = self.stage.transition(event)?;

        debug!(
            from = self.stage.name(),
            to = transition.stage.name(),
            "Stage transition"
        );
        self.stage = transition.stage;
        self.last_active = Instant::now();
        if leaves_stage {
            self.epoch += 1;
        }

        let mut pending = Vec::with_capacity(transition.effects.len());
        for effect in transition.effects {
            match effect {
                Effect::StopAmbientAudio => self.audio.stop_loop(),
                other => pending.push(other),
            }
        }
        Ok(pending)
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }
}

/// What clients see of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    #[serde(flatten)]
    pub stage: VibeStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_delay_ms: Option<u64>,
    pub ambient_audio: Option<LoopingAudioState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareCard>,
}

/// Why a model result was not applied to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stale {
    Gone,
    Superseded,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, VibeSession>>,
    settings: SessionSettings,
}

impl SessionStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, VibeSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> SessionSnapshot {
        let id = Uuid::new_v4();
        let session = VibeSession::new();
        let snapshot = self.snapshot_of(id, &session);

        let mut sessions = self.lock();
        sessions.insert(id, session);
        metrics::set_live_sessions(sessions.len());
        debug!(session = %id, "Created vibe session");
        snapshot
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.lock();
        let removed = sessions.remove(&id).is_some();
        metrics::set_live_sessions(sessions.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<SessionSnapshot> {
        let sessions = self.lock();
        sessions.get(&id).map(|s| self.snapshot_of(id, s))
    }

    /// Run `f` against a session, marking it active.
    pub fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut VibeSession) -> T) -> Option<T> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id)?;
        session.touch();
        Some(f(session))
    }

    /// Feed back the outcome of a model call issued at `epoch`.
    pub fn apply_if_current(
        &self,
        id: Uuid,
        epoch: u64,
        event: StageEvent,
    ) -> Result<Result<Vec<Effect>, TransitionError>, Stale> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(Stale::Gone)?;
        if session.epoch != epoch {
            return Err(Stale::Superseded);
        }
        Ok(session.apply(event))
    }

    /// Drop sessions idle for longer than the configured timeout.
    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }

    fn prune_idle_at(&self, now: Instant) -> usize {
        let timeout = self.settings.idle_timeout;

        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) <= timeout);
        let pruned = before - sessions.len();
        metrics::set_live_sessions(sessions.len());

        if pruned > 0 {
            info!("Pruned {} idle vibe sessions", pruned);
        }
        pruned
    }

    fn snapshot_of(&self, id: Uuid, session: &VibeSession) -> SessionSnapshot {
        let share = match &session.stage {
            VibeStage::Results {
                outcome: ResultsOutcome::Soundtrack { soundtrack },
            } => Some(ShareCard::new(
                soundtrack,
                self.settings.public_url.as_deref(),
            )),
            _ => None,
        };
        let advance_delay_ms = match &session.stage {
            VibeStage::Quiz { .. } => Some(
                u64::try_from(self.settings.quiz_advance_delay.as_millis()).unwrap_or(u64::MAX),
            ),
            _ => None,
        };

        SessionSnapshot {
            id,
            stage: session.stage.clone(),
            advance_delay_ms,
            ambient_audio: session.audio.now_playing().cloned(),
            share,
        }
    }
}
