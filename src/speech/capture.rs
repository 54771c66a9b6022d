//! Continuous speech capture with transparent restart.
//!
//! [`SpeechCapture`] owns the recognition state the rest of the app sees:
//!
//! ```text
//!  start() ──► intent=true, active=true ──► provider.start(pass N)
//!                       │
//!       Segment{final}  │  append to transcript
//!       Ended(pass N)   │  intent? ──yes──► provider.start(pass N+1)
//!                       │         └─no───► active=false
//!       Failed(pass N)  └──► intent=false, active=false
//! ```
//!
//! Providers deliver [`RecognitionEvent`]s through an unbounded channel;
//! the owner drains it with [`SpeechCapture::poll_events`].  Each event is
//! tagged with the [`PassId`] it belongs to and events from any other pass
//! are dropped.

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Identifies one recognition pass (start → end of a provider session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u64);

impl PassId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Emitted by a [`RecognitionProvider`] while a pass is running.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Recognised text.  Interim (`is_final == false`) segments are ignored.
    Segment {
        pass: PassId,
        text: String,
        is_final: bool,
    },
    /// The pass ended, either on request or on the provider's own timeout.
    Ended { pass: PassId },
    /// The pass failed and will produce no further events.
    Failed { pass: PassId, message: String },
}

impl RecognitionEvent {
    pub fn pass(&self) -> PassId {
        match self {
            RecognitionEvent::Segment { pass, .. }
            | RecognitionEvent::Ended { pass }
            | RecognitionEvent::Failed { pass, .. } => *pass,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors from a recognition provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// No recogniser is available (missing model, dictation disabled).
    #[error("speech recognition unavailable: {0}")]
    Unavailable(String),

    /// The input device could not be opened.
    #[error("microphone error: {0}")]
    Device(String),

    /// The recogniser failed while running.
    #[error("recognition failed: {0}")]
    Recognition(String),
}

// ---------------------------------------------------------------------------
// RecognitionProvider trait
// ---------------------------------------------------------------------------

/// A continuous speech recogniser.
///
/// `start` must return promptly; recognition runs in the background and
/// reports through `sink`.  A pass always finishes with exactly one
/// `Ended` or `Failed` event unless the provider is dropped.
pub trait RecognitionProvider: Send {
    fn start(
        &mut self,
        pass: PassId,
        sink: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), CaptureError>;

    /// Ask the running pass to finish.  It still reports `Ended`.
    fn stop(&mut self);
}

/// Provider used when dictation is disabled or no model is installed.
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RecognitionProvider for UnavailableRecognizer {
    fn start(
        &mut self,
        _pass: PassId,
        _sink: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable(self.reason.clone()))
    }

    fn stop(&mut self) {}
}

// ---------------------------------------------------------------------------
// SpeechCapture
// ---------------------------------------------------------------------------

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTransition {
    /// A final segment was added to the transcript.
    Appended,
    /// The pass ended while the user still wanted to listen; a new one began.
    Restarted,
    /// Capture is now inactive.
    Stopped,
    /// The provider failed; capture is now inactive.
    Failed,
}

/// Recognition state plus the event queue feeding it.
pub struct SpeechCapture {
    provider: Box<dyn RecognitionProvider>,
    events_tx: UnboundedSender<RecognitionEvent>,
    events_rx: UnboundedReceiver<RecognitionEvent>,
    active: bool,
    intent: bool,
    transcript: String,
    current: Option<PassId>,
    next_pass: u64,
}

impl SpeechCapture {
    pub fn new(provider: Box<dyn RecognitionProvider>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            events_tx,
            events_rx,
            active: false,
            intent: false,
            transcript: String::new(),
            current: None,
            next_pass: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the user still wants to listen.
    pub fn intent(&self) -> bool {
        self.intent
    }

    /// Finalised text recognised since the last `start` or reset.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn current_pass(&self) -> Option<PassId> {
        self.current
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Begin listening.  Does nothing if already active.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active {
            return Ok(());
        }
        self.transcript.clear();
        self.intent = true;
        match self.begin_pass() {
            Ok(()) => {
                self.active = true;
                log::info!("capture: listening");
                Ok(())
            }
            Err(e) => {
                self.intent = false;
                log::error!("capture: could not start: {e}");
                Err(e)
            }
        }
    }

    /// Stop listening.  `active` clears once the provider reports the end
    /// of the pass.
    pub fn stop(&mut self) {
        self.intent = false;
        if self.active {
            self.provider.stop();
        }
    }

    /// Stop and go inactive immediately, ignoring the pass's end event.
    pub fn shutdown(&mut self) {
        self.intent = false;
        if self.active {
            self.provider.stop();
            log::info!("capture: shut down");
        }
        self.active = false;
        self.current = None;
    }

    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
    }

    fn begin_pass(&mut self) -> Result<(), CaptureError> {
        let pass = PassId(self.next_pass);
        self.next_pass += 1;
        self.current = Some(pass);
        if let Err(e) = self.provider.start(pass, self.events_tx.clone()) {
            self.current = None;
            return Err(e);
        }
        log::debug!("capture: pass {} started", pass.value());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Apply one provider event.  Returns `None` when it changed nothing.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Option<CaptureTransition> {
        if Some(event.pass()) != self.current {
            log::debug!("capture: dropping event from stale pass {}", event.pass().value());
            return None;
        }

        match event {
            RecognitionEvent::Segment { is_final: false, .. } => None,
            RecognitionEvent::Segment { text, .. } => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                if !self.transcript.is_empty() && !self.transcript.ends_with(char::is_whitespace) {
                    self.transcript.push(' ');
                }
                self.transcript.push_str(text);
                Some(CaptureTransition::Appended)
            }
            RecognitionEvent::Ended { .. } if self.intent => match self.begin_pass() {
                Ok(()) => Some(CaptureTransition::Restarted),
                Err(e) => {
                    log::error!("capture: restart failed: {e}");
                    self.intent = false;
                    self.active = false;
                    Some(CaptureTransition::Failed)
                }
            },
            RecognitionEvent::Ended { .. } => {
                self.active = false;
                self.current = None;
                log::info!("capture: stopped");
                Some(CaptureTransition::Stopped)
            }
            RecognitionEvent::Failed { message, .. } => {
                log::error!("capture: recognition error: {message}");
                self.intent = false;
                self.active = false;
                self.current = None;
                Some(CaptureTransition::Failed)
            }
        }
    }

    /// Drain and apply every queued provider event.
    pub fn poll_events(&mut self) -> Vec<CaptureTransition> {
        let mut applied = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(t) = self.handle_event(event) {
                applied.push(t);
            }
        }
        applied
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared view into what a [`ScriptedRecognizer`] was asked to do.
    #[derive(Default)]
    pub(crate) struct RecognizerLog {
        pub started: Vec<PassId>,
        pub stops: usize,
        pub sink: Option<UnboundedSender<RecognitionEvent>>,
        pub fail_next_start: bool,
    }

    impl RecognizerLog {
        pub fn last_pass(&self) -> PassId {
            *self.started.last().expect("no pass started")
        }

        pub fn emit(&self, event: RecognitionEvent) {
            self.sink
                .as_ref()
                .expect("provider never started")
                .send(event)
                .expect("capture dropped");
        }
    }

    /// Recognition provider driven entirely by the test.
    pub(crate) struct ScriptedRecognizer(pub Arc<Mutex<RecognizerLog>>);

    impl RecognitionProvider for ScriptedRecognizer {
        fn start(
            &mut self,
            pass: PassId,
            sink: UnboundedSender<RecognitionEvent>,
        ) -> Result<(), CaptureError> {
            let mut log = self.0.lock().unwrap();
            if std::mem::take(&mut log.fail_next_start) {
                return Err(CaptureError::Device("no microphone".into()));
            }
            log.started.push(pass);
            log.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }
    }

    fn capture() -> (SpeechCapture, Arc<Mutex<RecognizerLog>>) {
        let log = Arc::new(Mutex::new(RecognizerLog::default()));
        let capture = SpeechCapture::new(Box::new(ScriptedRecognizer(Arc::clone(&log))));
        (capture, log)
    }

    fn segment(pass: PassId, text: &str, is_final: bool) -> RecognitionEvent {
        RecognitionEvent::Segment {
            pass,
            text: text.into(),
            is_final,
        }
    }

    #[test]
    fn start_activates_and_clears_transcript() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        cap.handle_event(segment(p, "hello", true));
        cap.stop();
        cap.handle_event(RecognitionEvent::Ended { pass: p });
        assert_eq!(cap.transcript(), "hello");

        cap.start().unwrap();
        assert!(cap.is_active());
        assert!(cap.intent());
        assert_eq!(cap.transcript(), "");
    }

    #[test]
    fn start_while_active_is_noop() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        cap.handle_event(segment(p, "keep me", true));
        cap.start().unwrap();
        assert_eq!(log.lock().unwrap().started.len(), 1);
        assert_eq!(cap.transcript(), "keep me");
    }

    #[test]
    fn only_final_segments_are_appended_in_order() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let log = log.lock().unwrap();
        let p = log.last_pass();
        log.emit(segment(p, "def", false));
        log.emit(segment(p, "def solve", true));
        log.emit(segment(p, "of n", false));
        log.emit(segment(p, "for n", true));
        drop(log);

        let applied = cap.poll_events();
        assert_eq!(applied, vec![CaptureTransition::Appended, CaptureTransition::Appended]);
        assert_eq!(cap.transcript(), "def solve for n");
    }

    #[test]
    fn end_with_intent_restarts_transparently() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let first = log.lock().unwrap().last_pass();
        cap.handle_event(segment(first, "part one", true));

        assert_eq!(
            cap.handle_event(RecognitionEvent::Ended { pass: first }),
            Some(CaptureTransition::Restarted)
        );
        assert!(cap.is_active());
        let second = log.lock().unwrap().last_pass();
        assert_ne!(first, second);

        cap.handle_event(segment(second, "part two", true));
        assert_eq!(cap.transcript(), "part one part two");
    }

    #[test]
    fn stop_then_end_deactivates() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        cap.stop();
        assert!(!cap.intent());
        assert!(cap.is_active());
        assert_eq!(log.lock().unwrap().stops, 1);

        assert_eq!(
            cap.handle_event(RecognitionEvent::Ended { pass: p }),
            Some(CaptureTransition::Stopped)
        );
        assert!(!cap.is_active());
        assert_eq!(log.lock().unwrap().started.len(), 1);

        // A repeated end for the same pass neither restarts nor reactivates.
        assert_eq!(cap.handle_event(RecognitionEvent::Ended { pass: p }), None);
        assert!(!cap.is_active());
        assert_eq!(log.lock().unwrap().started.len(), 1);
    }

    #[test]
    fn provider_error_forces_inactive_without_retry() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        assert_eq!(
            cap.handle_event(RecognitionEvent::Failed {
                pass: p,
                message: "network".into()
            }),
            Some(CaptureTransition::Failed)
        );
        assert!(!cap.is_active());
        assert!(!cap.intent());
        assert_eq!(log.lock().unwrap().started.len(), 1);
    }

    #[test]
    fn failed_start_leaves_capture_off() {
        let (mut cap, log) = capture();
        log.lock().unwrap().fail_next_start = true;
        assert!(matches!(cap.start(), Err(CaptureError::Device(_))));
        assert!(!cap.is_active());
        assert!(!cap.intent());
        assert!(cap.current_pass().is_none());
    }

    #[test]
    fn failed_restart_forces_inactive() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        log.lock().unwrap().fail_next_start = true;
        assert_eq!(
            cap.handle_event(RecognitionEvent::Ended { pass: p }),
            Some(CaptureTransition::Failed)
        );
        assert!(!cap.is_active());
        assert!(!cap.intent());
    }

    #[test]
    fn stale_pass_events_are_ignored() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let first = log.lock().unwrap().last_pass();
        cap.stop();
        cap.handle_event(RecognitionEvent::Ended { pass: first });

        cap.start().unwrap();
        let second = log.lock().unwrap().last_pass();

        // Late events from the first pass change nothing.
        assert_eq!(cap.handle_event(segment(first, "old", true)), None);
        assert_eq!(cap.handle_event(RecognitionEvent::Ended { pass: first }), None);
        assert!(cap.is_active());
        assert_eq!(cap.current_pass(), Some(second));
        assert_eq!(cap.transcript(), "");
    }

    #[test]
    fn shutdown_is_immediate() {
        let (mut cap, log) = capture();
        cap.start().unwrap();
        let p = log.lock().unwrap().last_pass();
        cap.shutdown();
        assert!(!cap.is_active());
        assert!(!cap.intent());
        assert_eq!(log.lock().unwrap().stops, 1);
        // The pass's own end event arrives later and is ignored.
        assert_eq!(cap.handle_event(RecognitionEvent::Ended { pass: p }), None);
        assert_eq!(log.lock().unwrap().started.len(), 1);
    }

    #[test]
    fn unavailable_recognizer_refuses_to_start() {
        let mut cap = SpeechCapture::new(Box::new(UnavailableRecognizer::new("no model")));
        assert_eq!(
            cap.start(),
            Err(CaptureError::Unavailable("no model".into()))
        );
        assert!(!cap.is_active());
    }
}
