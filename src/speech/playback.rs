//! Spoken playback of interviewer replies.
//!
//! [`SpeechPlayback`] tracks a single utterance at a time.  `speak` always
//! cancels whatever is playing first, and events are tagged with an
//! [`UtteranceId`] so a cancelled utterance can never flip `speaking` for
//! its replacement.

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub(crate) u64);

impl UtteranceId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Emitted by a [`SynthesisProvider`] for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Audio started playing.
    Started(UtteranceId),
    /// Audio finished playing on its own.
    Ended(UtteranceId),
    Failed { id: UtteranceId, message: String },
}

impl SynthesisEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            SynthesisEvent::Started(id) | SynthesisEvent::Ended(id) => *id,
            SynthesisEvent::Failed { id, .. } => *id,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors from a synthesis provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// HTTP transport or connection error.
    #[error("speech request failed: {0}")]
    Request(String),

    #[error("speech request timed out")]
    Timeout,

    /// Non-2xx response from the speech endpoint.
    #[error("speech endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The returned audio could not be decoded.
    #[error("could not decode speech audio: {0}")]
    Decode(String),

    /// No output device, or the audio thread is gone.
    #[error("audio output error: {0}")]
    Output(String),
}

impl From<reqwest::Error> for PlaybackError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PlaybackError::Timeout
        } else {
            PlaybackError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisProvider trait
// ---------------------------------------------------------------------------

/// A text-to-speech backend.
///
/// `speak` returns promptly; synthesis and playback happen in the
/// background and report through `sink`.
pub trait SynthesisProvider: Send {
    fn speak(
        &mut self,
        id: UtteranceId,
        text: &str,
        sink: UnboundedSender<SynthesisEvent>,
    ) -> Result<(), PlaybackError>;

    /// Stop the current utterance.  No `Ended` event is required afterwards.
    fn cancel(&mut self);
}

// ---------------------------------------------------------------------------
// SpeechPlayback
// ---------------------------------------------------------------------------

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTransition {
    Started,
    Finished,
    Failed,
}

pub struct SpeechPlayback {
    provider: Box<dyn SynthesisProvider>,
    events_tx: UnboundedSender<SynthesisEvent>,
    events_rx: UnboundedReceiver<SynthesisEvent>,
    speaking: bool,
    current: Option<UtteranceId>,
    next_id: u64,
}

impl SpeechPlayback {
    pub fn new(provider: Box<dyn SynthesisProvider>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            events_tx,
            events_rx,
            speaking: false,
            current: None,
            next_id: 1,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current
    }

    /// Cancel any utterance in progress, then start speaking `text`.
    ///
    /// `speaking` only becomes true once the provider reports `Started`.
    pub fn speak(&mut self, text: &str) -> Result<UtteranceId, PlaybackError> {
        self.cancel();

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        self.current = Some(id);

        if let Err(e) = self.provider.speak(id, text, self.events_tx.clone()) {
            log::warn!("playback: could not speak: {e}");
            self.current = None;
            return Err(e);
        }
        log::debug!("playback: utterance {} queued", id.value());
        Ok(id)
    }

    /// Stop speaking.  Safe to call at any time.
    pub fn cancel(&mut self) {
        if self.current.take().is_some() {
            self.provider.cancel();
            log::debug!("playback: cancelled");
        }
        self.speaking = false;
    }

    /// Apply one provider event.  Returns `None` for events that belong to
    /// any utterance other than the current one.
    pub fn handle_event(&mut self, event: SynthesisEvent) -> Option<PlaybackTransition> {
        if Some(event.id()) != self.current {
            log::debug!("playback: dropping event for stale utterance {}", event.id().value());
            return None;
        }

        match event {
            SynthesisEvent::Started(_) => {
                self.speaking = true;
                Some(PlaybackTransition::Started)
            }
            SynthesisEvent::Ended(_) => {
                self.speaking = false;
                self.current = None;
                Some(PlaybackTransition::Finished)
            }
            SynthesisEvent::Failed { message, .. } => {
                log::warn!("playback: synthesis error: {message}");
                self.speaking = false;
                self.current = None;
                Some(PlaybackTransition::Failed)
            }
        }
    }

    /// Drain and apply every queued provider event.
    pub fn poll_events(&mut self) -> Vec<PlaybackTransition> {
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

    #[derive(Default)]
    pub(crate) struct SynthLog {
        pub spoken: Vec<(UtteranceId, String)>,
        pub cancels: usize,
        pub sink: Option<UnboundedSender<SynthesisEvent>>,
        /// Emit `Started` + `Ended` as soon as `speak` is called.
        pub auto_complete: bool,
        pub fail_next: bool,
    }

    impl SynthLog {
        pub fn texts(&self) -> Vec<String> {
            self.spoken.iter().map(|(_, t)| t.clone()).collect()
        }

        pub fn emit(&self, event: SynthesisEvent) {
            self.sink
                .as_ref()
                .expect("never spoke")
                .send(event)
                .expect("playback dropped");
        }
    }

    pub(crate) struct ScriptedSynthesizer(pub Arc<Mutex<SynthLog>>);

    impl SynthesisProvider for ScriptedSynthesizer {
        fn speak(
            &mut self,
            id: UtteranceId,
            text: &str,
            sink: UnboundedSender<SynthesisEvent>,
        ) -> Result<(), PlaybackError> {
            let mut log = self.0.lock().unwrap();
            if std::mem::take(&mut log.fail_next) {
                return Err(PlaybackError::Output("no device".into()));
            }
            log.spoken.push((id, text.to_string()));
            if log.auto_complete {
                let _ = sink.send(SynthesisEvent::Started(id));
                let _ = sink.send(SynthesisEvent::Ended(id));
            }
            log.sink = Some(sink);
            Ok(())
        }

        fn cancel(&mut self) {
            self.0.lock().unwrap().cancels += 1;
        }
    }

    fn playback(auto_complete: bool) -> (SpeechPlayback, Arc<Mutex<SynthLog>>) {
        let log = Arc::new(Mutex::new(SynthLog {
            auto_complete,
            ..SynthLog::default()
        }));
        let pb = SpeechPlayback::new(Box::new(ScriptedSynthesizer(Arc::clone(&log))));
        (pb, log)
    }

    #[test]
    fn speaking_follows_start_and_end() {
        let (mut pb, log) = playback(false);
        let id = pb.speak("hello").unwrap();
        assert!(!pb.is_speaking());

        assert_eq!(
            pb.handle_event(SynthesisEvent::Started(id)),
            Some(PlaybackTransition::Started)
        );
        assert!(pb.is_speaking());
        assert_eq!(
            pb.handle_event(SynthesisEvent::Ended(id)),
            Some(PlaybackTransition::Finished)
        );
        assert!(!pb.is_speaking());
        assert_eq!(log.lock().unwrap().texts(), vec!["hello"]);
    }

    #[test]
    fn second_speak_replaces_first() {
        let (mut pb, log) = playback(true);
        pb.speak("A").unwrap();
        let b = pb.speak("B").unwrap();

        let applied = pb.poll_events();
        assert_eq!(
            applied,
            vec![PlaybackTransition::Started, PlaybackTransition::Finished]
        );
        let log = log.lock().unwrap();
        assert_eq!(log.texts(), vec!["A", "B"]);
        assert_eq!(log.spoken[1].0, b);
        assert_eq!(log.cancels, 1);
        assert!(!pb.is_speaking());
    }

    #[test]
    fn late_end_of_cancelled_utterance_is_ignored() {
        let (mut pb, _log) = playback(false);
        let a = pb.speak("A").unwrap();
        pb.handle_event(SynthesisEvent::Started(a));
        let b = pb.speak("B").unwrap();
        pb.handle_event(SynthesisEvent::Started(b));

        assert_eq!(pb.handle_event(SynthesisEvent::Ended(a)), None);
        assert!(pb.is_speaking());
        assert_eq!(pb.current(), Some(b));
    }

    #[test]
    fn cancel_is_idempotent() {
        let (mut pb, log) = playback(false);
        let id = pb.speak("A").unwrap();
        pb.handle_event(SynthesisEvent::Started(id));

        pb.cancel();
        pb.cancel();
        assert!(!pb.is_speaking());
        assert_eq!(log.lock().unwrap().cancels, 1);

        // Nothing was playing to begin with.
        let (mut idle, idle_log) = playback(false);
        idle.cancel();
        assert_eq!(idle_log.lock().unwrap().cancels, 0);
    }

    #[test]
    fn failure_clears_speaking() {
        let (mut pb, _log) = playback(false);
        let id = pb.speak("A").unwrap();
        pb.handle_event(SynthesisEvent::Started(id));
        assert_eq!(
            pb.handle_event(SynthesisEvent::Failed {
                id,
                message: "decoder".into()
            }),
            Some(PlaybackTransition::Failed)
        );
        assert!(!pb.is_speaking());
        assert!(pb.current().is_none());
    }

    #[test]
    fn provider_refusal_is_reported() {
        let (mut pb, log) = playback(false);
        log.lock().unwrap().fail_next = true;
        assert!(matches!(pb.speak("A"), Err(PlaybackError::Output(_))));
        assert!(pb.current().is_none());
        assert!(!pb.is_speaking());
    }
}
