//! Audio front end for dictation: microphone capture → downmix → 16 kHz
//! resampling → utterance segmentation.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → downmix
//!           → StreamResampler → UtteranceSegmenter → utterances (16 kHz mono)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::mpsc;
//! use interview_coach::audio::{AudioChunk, Microphone};
//!
//! let (tx, rx) = mpsc::channel::<AudioChunk>();
//! let mic = Microphone::open_default().unwrap();
//! let _handle = mic.start(tx).unwrap(); // drop the handle to stop
//!
//! while let Ok(chunk) = rx.recv() {
//!     println!("received {} samples @ {}Hz", chunk.samples.len(), chunk.sample_rate);
//! }
//! ```

pub mod capture;
pub mod resample;
pub mod vad;

pub use capture::{AudioChunk, Microphone, MicrophoneError, StreamHandle};
pub use resample::{downmix, ResampleError, StreamResampler, WHISPER_SAMPLE_RATE};
pub use vad::{SegmentEvent, SegmenterConfig, UtteranceSegmenter, VadDetector, FRAME_SAMPLES};
