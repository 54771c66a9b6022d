use thiserror::Error;

use super::state::SessionState;
use crate::agent::AgentError;
use crate::config::ConfigError;
use crate::speech::CaptureError;

/// Errors reported by [`SessionOrchestrator`](super::SessionOrchestrator).
///
/// Rejected preconditions (`EmptyInput`, `InvalidState`, `Busy`) change
/// nothing.  The rest are also stored as the session's last error so the UI
/// can show them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Failed to initialize the interview. Please ensure your API key is correctly configured and try again. ({0})")]
    Configuration(ConfigError),

    /// Opening the conversation or fetching the first question failed.
    #[error("Failed to initialize the interview: {0}")]
    Start(AgentError),

    #[error("Failed to get a response from the AI: {0}")]
    Reply(AgentError),

    #[error("Please provide your resume before starting the interview.")]
    EmptyResume,

    #[error("There is nothing to send.")]
    EmptyInput,

    #[error("cannot {operation} while the interview is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Still waiting for the interviewer to reply.")]
    Busy,

    #[error("Dictation is unavailable: {0}")]
    Capture(CaptureError),
}

impl SessionError {
    /// Map a failure of `start` to the matching variant.
    pub(crate) fn from_start(e: AgentError) -> Self {
        match e {
            AgentError::Configuration(c) => SessionError::Configuration(c),
            other => SessionError::Start(other),
        }
    }
}
