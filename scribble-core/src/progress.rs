//! Collaborator interfaces for progress tracking and messaging.
//!
//! The exercise only emits signals; storing progress and presenting
//! messages belong to the host application.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::level::GameSession;

/// Cue sent to the messaging collaborator (mascot, toast, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTrigger {
    /// A level has started.
    GameStart,
    /// A digit or a whole problem was answered correctly.
    GoodProgress,
    /// A wrong digit was submitted.
    InvalidMove,
    /// The level was won.
    Victory,
}

impl MessageTrigger {
    /// Trigger name as used by message content.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameStart => "game_start",
            Self::GoodProgress => "good_progress",
            Self::InvalidMove => "invalid_move",
            Self::Victory => "victory",
        }
    }
}

/// Receives progress counters and completion records.
pub trait ProgressTracker: Send + Sync {
    /// A digit was submitted.
    fn increment_moves(&self);

    /// A wrong digit was submitted.
    fn record_invalid_move(&self);

    /// A level was won.
    fn record_completion(&self, session: &GameSession);
}

/// Receives fire-and-forget message cues.
pub trait Messenger: Send + Sync {
    /// Show whatever content is keyed by `trigger`.
    fn cue(&self, trigger: MessageTrigger);
}

/// Progress tracker that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressTracker for NullProgress {
    fn increment_moves(&self) {}
    fn record_invalid_move(&self) {}
    fn record_completion(&self, _session: &GameSession) {}
}

/// Messenger that only logs cues.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessenger;

impl Messenger for NullMessenger {
    fn cue(&self, trigger: MessageTrigger) {
        tracing::debug!("Message cue: {}", trigger.as_str());
    }
}

#[derive(Debug, Default)]
struct ProgressCounters {
    moves: u32,
    invalid_moves: u32,
    completions: Vec<GameSession>,
}

/// Progress tracker that keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    inner: Mutex<ProgressCounters>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submissions seen.
    #[must_use]
    pub fn moves(&self) -> u32 {
        self.inner.lock().map(|c| c.moves).unwrap_or_default()
    }

    /// Number of wrong submissions seen.
    #[must_use]
    pub fn invalid_moves(&self) -> u32 {
        self.inner.lock().map(|c| c.invalid_moves).unwrap_or_default()
    }

    /// Completed sessions, oldest first.
    #[must_use]
    pub fn completions(&self) -> Vec<GameSession> {
        self.inner
            .lock()
            .map(|c| c.completions.clone())
            .unwrap_or_default()
    }
}

impl ProgressTracker for RecordingProgress {
    fn increment_moves(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.moves += 1;
        }
    }

    fn record_invalid_move(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.invalid_moves += 1;
        }
    }

    fn record_completion(&self, session: &GameSession) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.completions.push(session.clone());
        }
    }
}

/// Messenger that keeps every cue in memory.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    cues: Mutex<Vec<MessageTrigger>>,
}

impl RecordingMessenger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cues received, oldest first.
    #[must_use]
    pub fn cues(&self) -> Vec<MessageTrigger> {
        self.cues.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Messenger for RecordingMessenger {
    fn cue(&self, trigger: MessageTrigger) {
        if let Ok(mut cues) = self.cues.lock() {
            cues.push(trigger);
        }
    }
}
