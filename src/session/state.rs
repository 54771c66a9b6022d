//! Session data: lifecycle state, message log and the UI snapshot.

use std::fmt;

use super::error::SessionError;
use super::setup::InterviewSetup;
use crate::agent::ConversationHandle;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of one interview attempt.
///
/// ```text
///  Setup ──start──► InProgress ──end──► Finished
///    ▲                                     │
///    └──────────────── reset ──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Setup,
    InProgress,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Setup => "in setup",
            SessionState::InProgress => "in progress",
            SessionState::Finished => "finished",
        })
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

/// One message in the log.  Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable state of the current interview.
#[derive(Debug)]
pub(crate) struct Session {
    pub state: SessionState,
    pub log: Vec<Turn>,
    /// Present exactly while `state != Setup`.
    pub handle: Option<ConversationHandle>,
    pub pending_reply: bool,
    pub last_error: Option<SessionError>,
    pub feedback: Option<String>,
    pub setup: Option<InterviewSetup>,
    /// Bumped by every reset; replies that started under an older
    /// generation are discarded.
    pub generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Setup,
            log: Vec::new(),
            handle: None,
            pending_reply: false,
            last_error: None,
            feedback: None,
            setup: None,
            generation: 0,
        }
    }

    /// Back to an empty `Setup`, returning the discarded handle.
    pub fn clear(&mut self) -> Option<ConversationHandle> {
        let generation = self.generation + 1;
        let handle = self.handle.take();
        *self = Self {
            generation,
            ..Self::new()
        };
        handle
    }

    /// Whether a reply begun at `generation` on `handle` still belongs here.
    pub fn is_current(&self, generation: u64, handle: Option<ConversationHandle>) -> bool {
        self.generation == generation && self.handle == handle
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Cloned view of the orchestrator for the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub log: Vec<Turn>,
    pub feedback: Option<String>,
    pub pending_reply: bool,
    pub last_error: Option<String>,
    pub setup: Option<InterviewSetup>,
    /// Dictation is running.
    pub listening: bool,
    /// Finalised transcript of the current dictation.
    pub transcript: String,
    /// The interviewer is speaking.
    pub speaking: bool,
}
