//! Per-session ambient audio context.
//!
//! Nothing is played server-side. The state is mirrored to the client, which
//! owns the actual audio element.

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopingAudioState {
    pub src: String,
    pub is_playing: bool,
}

/// Holds at most one looping track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientAudio {
    current: Option<LoopingAudioState>,
}

impl AmbientAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same `src` pauses or resumes. A different one replaces the current loop.
    pub fn toggle_loop(&mut self, src: &str) {
        match &mut self.current {
            Some(state) if state.src == src => {
                state.is_playing = !state.is_playing;
                debug!(src, playing = state.is_playing, "Toggled ambient loop");
            }
            current => {
                if let Some(previous) = current.take() {
                    debug!(src = %previous.src, "Tearing down ambient loop");
                }
                *current = Some(LoopingAudioState {
                    src: src.to_string(),
                    is_playing: true,
                });
                debug!(src, "Started ambient loop");
            }
        }
    }

    pub fn stop_loop(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!(src = %previous.src, "Stopped ambient loop");
        }
    }

    pub fn now_playing(&self) -> Option<&LoopingAudioState> {
        self.current.as_ref()
    }
}
