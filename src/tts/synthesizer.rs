//! [`SynthesisProvider`] implementations.
//!
//! [`VoiceSynthesizer`] runs each utterance as a tokio task:
//!
//! ```text
//!  speak(id) ──► synthesize(text) ──► player.play(audio) ──► Started(id)
//!                                                   │
//!                             poll clip.is_finished │ ──► Ended(id)
//!  cancel()  ──► abort task, stop clip (no event)
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::client::SpeechBackend;
use super::output::{AudioPlayer, Clip};
use crate::speech::{PlaybackError, SynthesisEvent, SynthesisProvider, UtteranceId};

const FINISH_POLL: Duration = Duration::from_millis(50);

/// Shared between a running utterance task and `cancel`.
#[derive(Default)]
struct Slot {
    cancelled: bool,
    clip: Option<Arc<dyn Clip>>,
}

struct Running {
    task: JoinHandle<()>,
    slot: Arc<Mutex<Slot>>,
}

/// Speaks through a [`SpeechBackend`] and an [`AudioPlayer`].
pub struct VoiceSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    player: Arc<dyn AudioPlayer>,
    runtime: Handle,
    running: Option<Running>,
}

impl VoiceSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, player: Arc<dyn AudioPlayer>, runtime: Handle) -> Self {
        Self {
            backend,
            player,
            runtime,
            running: None,
        }
    }
}

impl SynthesisProvider for VoiceSynthesizer {
    fn speak(
        &mut self,
        id: UtteranceId,
        text: &str,
        sink: UnboundedSender<SynthesisEvent>,
    ) -> Result<(), PlaybackError> {
        self.cancel();

        let slot = Arc::new(Mutex::new(Slot::default()));
        let task = self.runtime.spawn(play_utterance(
            id,
            text.to_string(),
            Arc::clone(&self.backend),
            Arc::clone(&self.player),
            Arc::clone(&slot),
            sink,
        ));
        self.running = Some(Running { task, slot });
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.task.abort();
        let mut slot = running.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.cancelled = true;
        if let Some(clip) = slot.clip.take() {
            clip.stop();
        }
    }
}

impl Drop for VoiceSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn play_utterance(
    id: UtteranceId,
    text: String,
    backend: Arc<dyn SpeechBackend>,
    player: Arc<dyn AudioPlayer>,
    slot: Arc<Mutex<Slot>>,
    sink: UnboundedSender<SynthesisEvent>,
) {
    let fail = |e: PlaybackError| {
        log::warn!("tts: utterance {} failed: {e}", id.value());
        let _ = sink.send(SynthesisEvent::Failed {
            id,
            message: e.to_string(),
        });
    };

    let audio = match backend.synthesize(&text).await {
        Ok(audio) => audio,
        Err(e) => return fail(e),
    };
    if audio.is_empty() {
        let _ = sink.send(SynthesisEvent::Started(id));
        let _ = sink.send(SynthesisEvent::Ended(id));
        return;
    }

    let clip = match player.play(audio) {
        Ok(clip) => clip,
        Err(e) => return fail(e),
    };
    {
        let mut s = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if s.cancelled {
            clip.stop();
            return;
        }
        s.clip = Some(Arc::clone(&clip));
    }

    let _ = sink.send(SynthesisEvent::Started(id));
    while !clip.is_finished() {
        tokio::time::sleep(FINISH_POLL).await;
    }
    if !slot.lock().unwrap_or_else(PoisonError::into_inner).cancelled {
        let _ = sink.send(SynthesisEvent::Ended(id));
    }
}

// ---------------------------------------------------------------------------
// SilentSynthesizer
// ---------------------------------------------------------------------------

/// Provider used when spoken replies are disabled: every utterance starts
/// and ends at once.
#[derive(Debug, Default)]
pub struct SilentSynthesizer;

impl SynthesisProvider for SilentSynthesizer {
    fn speak(
        &mut self,
        id: UtteranceId,
        _text: &str,
        sink: UnboundedSender<SynthesisEvent>,
    ) -> Result<(), PlaybackError> {
        let _ = sink.send(SynthesisEvent::Started(id));
        let _ = sink.send(SynthesisEvent::Ended(id));
        Ok(())
    }

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::output::tests::RecordingPlayer;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use tokio::sync::Notify;

    struct FakeBackend {
        result: Result<Vec<u8>, PlaybackError>,
        /// When set, synthesis waits for a permit.
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl SpeechBackend for FakeBackend {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, PlaybackError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    fn synth(
        result: Result<Vec<u8>, PlaybackError>,
        gate: Option<Arc<Notify>>,
    ) -> (VoiceSynthesizer, Arc<RecordingPlayer>) {
        let player = Arc::new(RecordingPlayer::default());
        let s = VoiceSynthesizer::new(
            Arc::new(FakeBackend { result, gate }),
            Arc::clone(&player) as Arc<dyn AudioPlayer>,
            Handle::current(),
        );
        (s, player)
    }

    async fn next(rx: &mut UnboundedReceiver<SynthesisEvent>) -> SynthesisEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no event in time")
            .expect("channel closed")
    }

    async fn wait_for_clip(player: &RecordingPlayer) -> Arc<crate::tts::output::tests::ManualClip> {
        for _ in 0..100 {
            if let Some(clip) = player.clips.lock().unwrap().last() {
                return Arc::clone(clip);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("nothing played");
    }

    #[tokio::test]
    async fn started_then_ended_when_clip_finishes() {
        let (mut s, player) = synth(Ok(vec![7, 7, 7]), None);
        let (tx, mut rx) = unbounded_channel();
        let id = UtteranceId(1);

        s.speak(id, "Hello, I'm Alex.", tx).unwrap();
        assert_eq!(next(&mut rx).await, SynthesisEvent::Started(id));

        let clip = wait_for_clip(&player).await;
        clip.finished.store(true, Ordering::SeqCst);
        assert_eq!(next(&mut rx).await, SynthesisEvent::Ended(id));
        assert_eq!(*player.played.lock().unwrap(), vec![vec![7, 7, 7]]);
    }

    #[tokio::test]
    async fn backend_error_is_reported_as_failed() {
        let (mut s, _player) = synth(Err(PlaybackError::Timeout), None);
        let (tx, mut rx) = unbounded_channel();

        s.speak(UtteranceId(4), "hi", tx).unwrap();
        match next(&mut rx).await {
            SynthesisEvent::Failed { id, message } => {
                assert_eq!(id, UtteranceId(4));
                assert!(message.contains("timed out"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn decode_error_is_reported_as_failed() {
        let (mut s, player) = synth(Ok(vec![1]), None);
        player.fail.store(true, Ordering::SeqCst);
        let (tx, mut rx) = unbounded_channel();

        s.speak(UtteranceId(2), "hi", tx).unwrap();
        assert!(matches!(next(&mut rx).await, SynthesisEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn cancel_stops_playing_clip_without_ended() {
        let (mut s, player) = synth(Ok(vec![1, 2]), None);
        let (tx, mut rx) = unbounded_channel();
        let id = UtteranceId(9);

        s.speak(id, "long answer", tx).unwrap();
        assert_eq!(next(&mut rx).await, SynthesisEvent::Started(id));
        let clip = wait_for_clip(&player).await;

        s.cancel();
        assert!(clip.stopped.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_before_synthesis_completes_plays_nothing() {
        let gate = Arc::new(Notify::new());
        let (mut s, player) = synth(Ok(vec![1, 2]), Some(Arc::clone(&gate)));
        let (tx, mut rx) = unbounded_channel();

        s.speak(UtteranceId(1), "question", tx).unwrap();
        s.cancel();
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(player.played.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_audio_starts_and_ends_immediately() {
        let (mut s, player) = synth(Ok(Vec::new()), None);
        let (tx, mut rx) = unbounded_channel();

        s.speak(UtteranceId(5), " ", tx).unwrap();
        assert_eq!(next(&mut rx).await, SynthesisEvent::Started(UtteranceId(5)));
        assert_eq!(next(&mut rx).await, SynthesisEvent::Ended(UtteranceId(5)));
        assert!(player.played.lock().unwrap().is_empty());
    }

    #[test]
    fn silent_synthesizer_completes_immediately() {
        let (tx, mut rx) = unbounded_channel();
        SilentSynthesizer.speak(UtteranceId(3), "hi", tx).unwrap();
        assert_eq!(rx.try_recv().unwrap(), SynthesisEvent::Started(UtteranceId(3)));
        assert_eq!(rx.try_recv().unwrap(), SynthesisEvent::Ended(UtteranceId(3)));
    }
}
