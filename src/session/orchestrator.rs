//! Interview lifecycle and the coordination between agent, capture and
//! playback.
//!
//! ```text
//!            ┌──────────────── SessionOrchestrator ─────────────────┐
//!  UI ──────►│ start / submit / end / reset / toggle_listening      │
//!            │                                                      │
//!            │  Mutex<Session>   Mutex<SpeechCapture>  Mutex<SpeechPlayback>
//!            └──────┬───────────────────┬──────────────────┬────────┘
//!                   ▼                   ▼                  ▼
//!          ConversationAgent   RecognitionProvider   SynthesisProvider
//! ```
//!
//! Every lock is taken for a short, synchronous section and released before
//! the next `.await`, so operations can run on any tokio worker while the UI
//! keeps polling [`SessionOrchestrator::snapshot`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::SessionError;
use super::setup::InterviewSetup;
use super::state::{Session, SessionSnapshot, SessionState, Turn};
use crate::agent::{self, ConversationAgent};
use crate::speech::{SpeechCapture, SpeechPlayback};

/// Agent turn appended when a reply could not be fetched.
pub const APOLOGY_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Feedback shown when the evaluation could not be fetched.
pub const FEEDBACK_FALLBACK: &str = "Sorry, I was unable to generate feedback for this session.";

pub struct SessionOrchestrator {
    agent: Arc<dyn ConversationAgent>,
    interviewer_name: String,
    session: Mutex<Session>,
    capture: Mutex<SpeechCapture>,
    playback: Mutex<SpeechPlayback>,
}

impl SessionOrchestrator {
    pub fn new(
        agent: Arc<dyn ConversationAgent>,
        capture: SpeechCapture,
        playback: SpeechPlayback,
    ) -> Self {
        Self {
            agent,
            interviewer_name: "Alex".into(),
            session: Mutex::new(Session::new()),
            capture: Mutex::new(capture),
            playback: Mutex::new(playback),
        }
    }

    /// Persona name used in the system instruction.
    pub fn with_interviewer_name(mut self, name: impl Into<String>) -> Self {
        self.interviewer_name = name.into();
        self
    }

    pub fn interviewer_name(&self) -> &str {
        &self.interviewer_name
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open a conversation and fetch the interviewer's first question.
    ///
    /// On failure the session stays in `Setup` with `last_error` set and an
    /// untouched log.
    pub async fn start(&self, setup: InterviewSetup) -> Result<(), SessionError> {
        let generation = {
            let mut s = self.session();
            check_state(&s, SessionState::Setup, "start")?;
            s.last_error = None;
            if setup.resume_text.trim().is_empty() {
                s.last_error = Some(SessionError::EmptyResume);
                return Err(SessionError::EmptyResume);
            }
            s.pending_reply = true;
            s.generation
        };

        log::info!(
            "session: starting {} interview ({})",
            setup.interview_type,
            setup
                .duration
                .map(|d| d.to_string())
                .unwrap_or_else(|| "open length".into())
        );

        let instruction =
            agent::system_instruction(setup.interview_type, setup.duration, &self.interviewer_name);
        let handle = match self.agent.open(&instruction).await {
            Ok(h) => h,
            Err(e) => return self.fail_start(generation, SessionError::from_start(e)),
        };

        let result = self
            .agent
            .send(handle, &agent::seed_message(&setup.resume_text))
            .await;

        let outcome = {
            let mut s = self.session();
            if !s.is_current(generation, None) || s.state != SessionState::Setup {
                log::debug!("session: discarding greeting for a reset session");
                None
            } else {
                match result {
                    Ok(greeting) => {
                        s.state = SessionState::InProgress;
                        s.handle = Some(handle);
                        s.log.push(Turn::agent(greeting.clone()));
                        s.setup = Some(setup);
                        s.pending_reply = false;
                        Some(Ok(greeting))
                    }
                    Err(e) => {
                        let err = SessionError::from_start(e);
                        log::error!("session: start failed: {err}");
                        s.pending_reply = false;
                        s.last_error = Some(err.clone());
                        Some(Err(err))
                    }
                }
            }
        };

        match outcome {
            Some(Ok(greeting)) => {
                log::info!("session: interview in progress");
                self.speak(&greeting);
                Ok(())
            }
            Some(Err(err)) => {
                self.agent.close(handle).await;
                Err(err)
            }
            None => {
                self.agent.close(handle).await;
                Ok(())
            }
        }
    }

    fn fail_start(&self, generation: u64, err: SessionError) -> Result<(), SessionError> {
        log::error!("session: start failed: {err}");
        let mut s = self.session();
        if s.is_current(generation, None) {
            s.pending_reply = false;
            s.last_error = Some(err.clone());
        }
        Err(err)
    }

    /// Send one candidate answer.
    ///
    /// The user turn is appended before the agent is called and is kept
    /// whatever happens.  A failed call appends [`APOLOGY_REPLY`] instead of
    /// a reply and returns `Ok`.
    pub async fn submit(&self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let (handle, generation) = {
            let mut s = self.session();
            check_state(&s, SessionState::InProgress, "submit")?;
            let handle = s.handle.ok_or(SessionError::InvalidState {
                operation: "submit",
                state: s.state,
            })?;
            s.last_error = None;
            s.log.push(Turn::user(text));
            s.pending_reply = true;
            (handle, s.generation)
        };

        self.playback().cancel();
        self.capture().reset_transcript();

        let result = self.agent.send(handle, text).await;

        let reply = {
            let mut s = self.session();
            if !s.is_current(generation, Some(handle)) {
                log::debug!("session: discarding late reply for conversation {handle}");
                return Ok(());
            }
            let reply = match result {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("session: reply failed: {e}");
                    s.last_error = Some(SessionError::Reply(e));
                    APOLOGY_REPLY.to_string()
                }
            };
            s.log.push(Turn::agent(reply.clone()));
            s.pending_reply = false;
            reply
        };

        self.speak(&reply);
        Ok(())
    }

    /// Ask for the evaluation and finish.  Always reaches `Finished`; a
    /// failed call stores [`FEEDBACK_FALLBACK`] as the feedback.
    pub async fn end(&self) -> Result<(), SessionError> {
        let (handle, generation) = {
            let mut s = self.session();
            check_state(&s, SessionState::InProgress, "end")?;
            let handle = s.handle.ok_or(SessionError::InvalidState {
                operation: "end",
                state: s.state,
            })?;
            s.last_error = None;
            s.pending_reply = true;
            (handle, s.generation)
        };

        log::info!("session: ending interview, requesting feedback");
        self.playback().cancel();
        self.capture().shutdown();

        let result = self.agent.send(handle, agent::FEEDBACK_PROMPT).await;

        let mut s = self.session();
        if !s.is_current(generation, Some(handle)) {
            log::debug!("session: discarding late feedback for conversation {handle}");
            return Ok(());
        }
        let feedback = match result {
            Ok(feedback) => feedback,
            Err(e) => {
                log::warn!("session: feedback failed: {e}");
                FEEDBACK_FALLBACK.to_string()
            }
        };
        s.feedback = Some(feedback);
        s.state = SessionState::Finished;
        s.pending_reply = false;
        log::info!("session: interview finished");
        Ok(())
    }

    /// Discard everything and return to `Setup`.
    ///
    /// Allowed from any state.  Replies still in flight are dropped when
    /// they arrive.
    pub async fn reset(&self) {
        let handle = self.session().clear();

        self.playback().cancel();
        {
            let mut capture = self.capture();
            capture.shutdown();
            capture.reset_transcript();
        }

        if let Some(handle) = handle {
            self.agent.close(handle).await;
        }
        log::info!("session: reset");
    }

    // -----------------------------------------------------------------------
    // Voice
    // -----------------------------------------------------------------------

    /// Flip dictation.  Speech in progress is cancelled first.  Returns
    /// whether dictation is now running.
    pub fn toggle_listening(&self) -> Result<bool, SessionError> {
        const OPERATION: &str = "toggle dictation";
        self.check_can_listen(OPERATION)?;
        self.playback().cancel();

        let active = self.capture().is_active();
        if active {
            self.capture().stop();
            Ok(false)
        } else {
            self.begin_capture(OPERATION).map(|()| true)
        }
    }

    pub fn start_listening(&self) -> Result<(), SessionError> {
        const OPERATION: &str = "start dictation";
        self.check_can_listen(OPERATION)?;
        self.playback().cancel();
        self.begin_capture(OPERATION)
    }

    pub fn stop_listening(&self) {
        self.capture().stop();
    }

    fn check_can_listen(&self, operation: &'static str) -> Result<(), SessionError> {
        let s = self.session();
        check_state(&s, SessionState::InProgress, operation)
    }

    /// Start capture with the session lock held, so `end` and `reset`
    /// cannot slip in between the state check and the microphone opening.
    /// Lock order is session, then capture.
    fn begin_capture(&self, operation: &'static str) -> Result<(), SessionError> {
        let mut s = self.session();
        check_state(&s, SessionState::InProgress, operation)?;
        let result = self.capture().start();
        result.map_err(|e| {
            let err = SessionError::Capture(e);
            s.last_error = Some(err.clone());
            err
        })
    }

    // -----------------------------------------------------------------------
    // Events & snapshot
    // -----------------------------------------------------------------------

    /// Apply queued recognition and synthesis events.  Call every frame.
    pub fn pump_events(&self) {
        self.capture().poll_events();
        self.playback().poll_events();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = {
            let s = self.session();
            SessionSnapshot {
                state: s.state,
                log: s.log.clone(),
                feedback: s.feedback.clone(),
                pending_reply: s.pending_reply,
                last_error: s.last_error.as_ref().map(ToString::to_string),
                setup: s.setup.clone(),
                listening: false,
                transcript: String::new(),
                speaking: false,
            }
        };
        {
            let capture = self.capture();
            snapshot.listening = capture.is_active();
            snapshot.transcript = capture.transcript().to_string();
        }
        snapshot.speaking = self.playback().is_speaking();
        snapshot
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn speak(&self, text: &str) {
        let result = self.playback().speak(text);
        if let Err(e) = result {
            log::warn!("session: reply will not be spoken: {e}");
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn capture(&self) -> MutexGuard<'_, SpeechCapture> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn playback(&self) -> MutexGuard<'_, SpeechPlayback> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `InvalidState` unless `session` is in `expected`, `Busy` while a reply
/// is pending.
fn check_state(
    session: &Session,
    expected: SessionState,
    operation: &'static str,
) -> Result<(), SessionError> {
    if session.state != expected {
        return Err(SessionError::InvalidState {
            operation,
            state: session.state,
        });
    }
    if session.pending_reply {
        return Err(SessionError::Busy);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
