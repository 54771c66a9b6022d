//! Energy-based voice activity detection and utterance segmentation.
//!
//! Audio is split into 30 ms frames (480 samples @ 16 kHz).  A frame is
//! *voice* when its RMS amplitude exceeds the configured threshold.
//!
//! [`VadDetector`] classifies frames and trims silence from a finished
//! clip.  [`UtteranceSegmenter`] runs over a live stream and cuts it into
//! utterances at pauses, which is what lets dictation produce text while the
//! candidate is still talking:
//!
//! ```text
//!  frames:  . . █ █ █ . █ █ . . . . . . . █ █ . . . . . . . . . . . .
//!                └──── utterance ────┘         └─ utt ─┘
//!                              trailing silence ▲     no voice for
//!                                                     pass timeout ▲
//! ```

/// Samples per 30 ms frame at 16 kHz.
pub const FRAME_SAMPLES: usize = 480;

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based voice detector.
///
/// ```rust
/// use interview_coach::audio::VadDetector;
///
/// let vad = VadDetector::new(0.01);
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(vad.trim_silence(&audio).len(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl VadDetector {
    /// `rms_threshold` is typically `0.01` for a quiet room and
    /// `0.02`–`0.05` in noisy environments.
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: FRAME_SAMPLES,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Returns `true` when the frame contains voice activity.
    pub fn is_voice(&self, frame: &[f32]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        mean_sq.sqrt() > self.rms_threshold
    }

    /// Trim leading and trailing silence.  Returns an empty slice when the
    /// whole clip is silent.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let frames: Vec<&[f32]> = audio.chunks(self.frame_size).collect();
        let Some(first) = frames.iter().position(|f| self.is_voice(f)) else {
            return &audio[0..0];
        };
        let last = frames.iter().rposition(|f| self.is_voice(f)).unwrap_or(first);

        let start = first * self.frame_size;
        let end = ((last + 1) * self.frame_size).min(audio.len());
        &audio[start..end]
    }
}

// ---------------------------------------------------------------------------
// UtteranceSegmenter
// ---------------------------------------------------------------------------

/// Timing rules for [`UtteranceSegmenter`], in 30 ms frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    pub rms_threshold: f32,
    /// Trailing silence that closes an utterance.
    pub end_silence_frames: usize,
    /// Utterances with less voiced audio than this are discarded.
    pub min_utterance_frames: usize,
    /// Silence, outside an utterance, that ends the whole pass.
    pub pass_silence_frames: usize,
    /// Hard cap on the pass length.
    pub max_pass_frames: usize,
}

impl SegmenterConfig {
    /// Convert wall-clock settings to frame counts.
    pub fn from_millis(
        rms_threshold: f32,
        end_silence_ms: u64,
        min_utterance_ms: u64,
        pass_silence_ms: u64,
        max_pass_ms: u64,
    ) -> Self {
        let frames = |ms: u64| ((ms as usize) / 30).max(1);
        Self {
            rms_threshold,
            end_silence_frames: frames(end_silence_ms),
            min_utterance_frames: frames(min_utterance_ms),
            pass_silence_frames: frames(pass_silence_ms),
            max_pass_frames: frames(max_pass_ms),
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self::from_millis(0.01, 900, 500, 8_000, 60_000)
    }
}

/// Output of [`UtteranceSegmenter::push`].
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// A complete utterance, trimmed of silence, ready for transcription.
    Utterance(Vec<f32>),
    /// The pass is over (too long, or silent for too long).  No further
    /// events follow.
    PassTimeout,
}

/// Streaming utterance splitter over 16 kHz mono audio.
pub struct UtteranceSegmenter {
    vad: VadDetector,
    config: SegmenterConfig,
    /// Partial frame carried between pushes.
    carry: Vec<f32>,
    utterance: Vec<f32>,
    in_utterance: bool,
    voiced_frames: usize,
    trailing_silence: usize,
    idle_frames: usize,
    total_frames: usize,
    timed_out: bool,
}

impl UtteranceSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            vad: VadDetector::new(config.rms_threshold),
            config,
            carry: Vec::with_capacity(FRAME_SAMPLES),
            utterance: Vec::new(),
            in_utterance: false,
            voiced_frames: 0,
            trailing_silence: 0,
            idle_frames: 0,
            total_frames: 0,
            timed_out: false,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// Feed 16 kHz mono samples.
    pub fn push(&mut self, samples: &[f32]) -> Vec<SegmentEvent> {
        let mut events = Vec::new();
        if self.timed_out {
            return events;
        }

        self.carry.extend_from_slice(samples);
        let frame_size = self.vad.frame_size();
        let whole = self.carry.len() / frame_size * frame_size;
        let frames: Vec<f32> = self.carry.drain(..whole).collect();

        for frame in frames.chunks_exact(frame_size) {
            self.push_frame(frame, &mut events);
            if self.timed_out {
                break;
            }
        }
        events
    }

    /// End of stream: returns the utterance in progress, if long enough.
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        self.carry.clear();
        self.close_utterance()
    }

    fn push_frame(&mut self, frame: &[f32], events: &mut Vec<SegmentEvent>) {
        self.total_frames += 1;

        if self.vad.is_voice(frame) {
            self.in_utterance = true;
            self.utterance.extend_from_slice(frame);
            self.voiced_frames += 1;
            self.trailing_silence = 0;
            self.idle_frames = 0;
        } else if self.in_utterance {
            self.utterance.extend_from_slice(frame);
            self.trailing_silence += 1;
            if self.trailing_silence >= self.config.end_silence_frames {
                if let Some(u) = self.close_utterance() {
                    events.push(SegmentEvent::Utterance(u));
                }
            }
        } else {
            self.idle_frames += 1;
            if self.idle_frames >= self.config.pass_silence_frames {
                self.timed_out = true;
                events.push(SegmentEvent::PassTimeout);
                return;
            }
        }

        if self.total_frames >= self.config.max_pass_frames {
            if let Some(u) = self.close_utterance() {
                events.push(SegmentEvent::Utterance(u));
            }
            self.timed_out = true;
            events.push(SegmentEvent::PassTimeout);
        }
    }

    fn close_utterance(&mut self) -> Option<Vec<f32>> {
        let audio = std::mem::take(&mut self.utterance);
        let long_enough = self.voiced_frames >= self.config.min_utterance_frames;
        self.in_utterance = false;
        self.voiced_frames = 0;
        self.trailing_silence = 0;
        self.idle_frames = 0;

        if !long_enough {
            return None;
        }
        Some(self.vad.trim_silence(&audio).to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(frames: usize) -> Vec<f32> {
        vec![0.0; frames * FRAME_SAMPLES]
    }

    fn voice(frames: usize) -> Vec<f32> {
        vec![0.5; frames * FRAME_SAMPLES]
    }

    fn config() -> SegmenterConfig {
        SegmenterConfig {
            rms_threshold: 0.01,
            end_silence_frames: 3,
            min_utterance_frames: 2,
            pass_silence_frames: 10,
            max_pass_frames: 100,
        }
    }

    // ---- VadDetector -------------------------------------------------------

    #[test]
    fn trims_leading_and_trailing_silence() {
        let mut audio = silence(1);
        audio.extend(voice(1));
        audio.extend(silence(1));
        assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), FRAME_SAMPLES);
    }

    #[test]
    fn all_silence_trims_to_empty() {
        assert!(VadDetector::new(0.01).trim_silence(&silence(3)).is_empty());
        assert!(VadDetector::new(0.01).trim_silence(&[]).is_empty());
    }

    #[test]
    fn quiet_noise_is_not_voice() {
        let vad = VadDetector::new(0.05);
        assert!(!vad.is_voice(&[0.01; FRAME_SAMPLES]));
        assert!(vad.is_voice(&[0.2; FRAME_SAMPLES]));
        assert!((vad.threshold() - 0.05).abs() < 1e-7);
    }

    // ---- UtteranceSegmenter ------------------------------------------------

    #[test]
    fn pause_closes_an_utterance() {
        let mut seg = UtteranceSegmenter::new(config());
        let mut events = seg.push(&silence(2));
        events.extend(seg.push(&voice(5)));
        assert!(events.is_empty());

        let events = seg.push(&silence(3));
        assert_eq!(events.len(), 1);
        match &events[0] {
            SegmentEvent::Utterance(audio) => assert_eq!(audio.len(), 5 * FRAME_SAMPLES),
            other => panic!("expected utterance, got {other:?}"),
        }
    }

    #[test]
    fn two_utterances_in_one_pass() {
        let mut seg = UtteranceSegmenter::new(config());
        let mut stream = voice(4);
        stream.extend(silence(4));
        stream.extend(voice(3));
        stream.extend(silence(4));

        let utterances = seg
            .push(&stream)
            .into_iter()
            .filter(|e| matches!(e, SegmentEvent::Utterance(_)))
            .count();
        assert_eq!(utterances, 2);
        assert!(!seg.is_timed_out());
    }

    #[test]
    fn blips_are_dropped() {
        let mut seg = UtteranceSegmenter::new(config());
        let mut stream = voice(1);
        stream.extend(silence(4));
        assert!(seg.push(&stream).is_empty());
    }

    #[test]
    fn frames_split_across_pushes() {
        let mut seg = UtteranceSegmenter::new(config());
        let stream = {
            let mut s = voice(4);
            s.extend(silence(3));
            s
        };
        let mut events = Vec::new();
        for piece in stream.chunks(100) {
            events.extend(seg.push(piece));
        }
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn long_silence_times_out_the_pass() {
        let mut seg = UtteranceSegmenter::new(config());
        let events = seg.push(&silence(12));
        assert_eq!(events, vec![SegmentEvent::PassTimeout]);
        assert!(seg.is_timed_out());
        assert!(seg.push(&voice(5)).is_empty());
    }

    #[test]
    fn max_length_flushes_then_times_out() {
        let mut seg = UtteranceSegmenter::new(SegmenterConfig {
            max_pass_frames: 6,
            ..config()
        });
        let events = seg.push(&voice(8));
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], SegmentEvent::Utterance(a) if a.len() == 6 * FRAME_SAMPLES));
        assert_eq!(events[1], SegmentEvent::PassTimeout);
    }

    #[test]
    fn finish_returns_utterance_in_progress() {
        let mut seg = UtteranceSegmenter::new(config());
        seg.push(&voice(3));
        assert_eq!(seg.finish().map(|a| a.len()), Some(3 * FRAME_SAMPLES));
        assert!(seg.finish().is_none());
    }

    #[test]
    fn config_from_millis_rounds_to_frames() {
        let c = SegmenterConfig::from_millis(0.02, 900, 500, 8_000, 60_000);
        assert_eq!(c.end_silence_frames, 30);
        assert_eq!(c.min_utterance_frames, 16);
        assert_eq!(c.pass_silence_frames, 266);
        assert_eq!(c.max_pass_frames, 2_000);
        assert_eq!(SegmenterConfig::from_millis(0.0, 0, 0, 0, 0).end_silence_frames, 1);
    }
}
