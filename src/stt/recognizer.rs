//! Continuous recognition over the microphone.
//!
//! Every pass runs on its own thread:
//!
//! ```text
//!  cpal callback ──AudioChunk──► downmix ► StreamResampler ► UtteranceSegmenter
//!                                                                 │
//!                                     Utterance(pcm) ◄────────────┘
//!                                           │
//!                                   SttEngine::transcribe ──► Segment{final}
//! ```
//!
//! A pass ends when it is stopped, when the segmenter reports a silence or
//! length timeout, or when the microphone goes away.  The last open
//! utterance is transcribed before `Ended` is sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::audio::{
    downmix, AudioChunk, Microphone, SegmentEvent, SegmenterConfig, StreamResampler,
    UtteranceSegmenter,
};
use crate::config::AudioConfig;
use crate::speech::{CaptureError, PassId, RecognitionEvent, RecognitionProvider};
use crate::stt::{SttEngine, SttError};

/// How often a pass checks its stop flag while no audio arrives.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl From<&AudioConfig> for SegmenterConfig {
    fn from(c: &AudioConfig) -> Self {
        let ms = |secs: f32| (secs.max(0.0) * 1000.0) as u64;
        SegmenterConfig::from_millis(
            c.vad_threshold,
            c.utterance_silence_ms,
            ms(c.min_utterance_secs),
            ms(c.pass_silence_timeout_secs),
            ms(c.max_pass_secs),
        )
    }
}

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

/// [`RecognitionProvider`] backed by the default microphone and Whisper.
pub struct WhisperRecognizer {
    engine: Arc<dyn SttEngine>,
    segmenter: SegmenterConfig,
    /// Stop flag of the running pass.
    running: Option<Arc<AtomicBool>>,
}

impl WhisperRecognizer {
    pub fn new(engine: Arc<dyn SttEngine>, audio: &AudioConfig) -> Self {
        Self {
            engine,
            segmenter: audio.into(),
            running: None,
        }
    }
}

impl RecognitionProvider for WhisperRecognizer {
    fn start(
        &mut self,
        pass: PassId,
        sink: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), CaptureError> {
        self.stop();

        let stop = Arc::new(AtomicBool::new(false));
        let worker = PassWorker {
            pass,
            engine: Arc::clone(&self.engine),
            segmenter: self.segmenter.clone(),
            stop: Arc::clone(&stop),
            sink,
        };

        // The cpal stream is not `Send`, so the device is opened on the pass
        // thread and the outcome reported back before `start` returns.
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);

        std::thread::Builder::new()
            .name(format!("recognizer-pass-{}", pass.value()))
            .spawn(move || {
                let opened = Microphone::open_default().and_then(|mic| {
                    let (tx, rx) = mpsc::channel();
                    let handle = mic.start(tx)?;
                    Ok((handle, rx))
                });
                match opened {
                    Ok((_stream, chunks)) => {
                        let _ = ready_tx.send(Ok(()));
                        worker.run(chunks);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(CaptureError::Device(e.to_string())));
                    }
                }
            })
            .map_err(|e| CaptureError::Device(format!("failed to spawn recognizer thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::debug!("recognizer: pass {} listening", pass.value());
                self.running = Some(stop);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::Device("recognizer thread exited".into())),
        }
    }

    fn stop(&mut self) {
        if let Some(flag) = self.running.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for WhisperRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// PassWorker
// ---------------------------------------------------------------------------

/// One recognition pass, independent of where the audio comes from.
struct PassWorker {
    pass: PassId,
    engine: Arc<dyn SttEngine>,
    segmenter: SegmenterConfig,
    stop: Arc<AtomicBool>,
    sink: UnboundedSender<RecognitionEvent>,
}

impl PassWorker {
    /// Consume chunks until stopped, timed out or disconnected, then report
    /// exactly one `Ended` or `Failed`.
    fn run(self, chunks: mpsc::Receiver<AudioChunk>) {
        let terminal = match self.listen(chunks) {
            Ok(()) => RecognitionEvent::Ended { pass: self.pass },
            Err(message) => {
                log::warn!("recognizer: pass {} failed: {message}", self.pass.value());
                RecognitionEvent::Failed {
                    pass: self.pass,
                    message,
                }
            }
        };
        let _ = self.sink.send(terminal);
    }

    fn listen(&self, chunks: mpsc::Receiver<AudioChunk>) -> Result<(), String> {
        let mut segmenter = UtteranceSegmenter::new(self.segmenter.clone());
        let mut resampler: Option<StreamResampler> = None;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let chunk = match chunks.recv_timeout(POLL_INTERVAL) {
                Ok(chunk) => chunk,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };

            if resampler.is_none() {
                let r = StreamResampler::new(chunk.sample_rate).map_err(|e| e.to_string())?;
                if !r.is_passthrough() {
                    log::debug!("recognizer: resampling {} Hz input to 16 kHz", chunk.sample_rate);
                }
                resampler = Some(r);
            }
            let Some(r) = resampler.as_mut() else {
                continue;
            };
            let mono = downmix(&chunk.samples, chunk.channels);
            let pcm = r.push(&mono).map_err(|e| e.to_string())?;

            for event in segmenter.push(&pcm) {
                match event {
                    SegmentEvent::Utterance(audio) => self.transcribe(&audio)?,
                    SegmentEvent::PassTimeout => {
                        log::debug!("recognizer: pass {} timed out", self.pass.value());
                        return Ok(());
                    }
                }
            }
        }

        if let Some(r) = resampler.as_mut() {
            let tail = r.flush().map_err(|e| e.to_string())?;
            for event in segmenter.push(&tail) {
                if let SegmentEvent::Utterance(audio) = event {
                    self.transcribe(&audio)?;
                }
            }
        }
        if let Some(audio) = segmenter.finish() {
            self.transcribe(&audio)?;
        }
        Ok(())
    }

    fn transcribe(&self, audio: &[f32]) -> Result<(), String> {
        match self.engine.transcribe(audio) {
            Ok(text) if text.is_empty() => Ok(()),
            Ok(text) => {
                let _ = self.sink.send(RecognitionEvent::Segment {
                    pass: self.pass,
                    text,
                    is_final: true,
                });
                Ok(())
            }
            Err(SttError::AudioTooShort) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
