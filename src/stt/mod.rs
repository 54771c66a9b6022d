//! Local speech-to-text with whisper.cpp.
//!
//! ```text
//! ┌──────────────┐  model_path  ┌───────────────┐   transcribe   ┌─────────────────────┐
//! │  ModelPaths  │ ───────────► │ WhisperEngine │ ◄───────────── │  WhisperRecognizer  │
//! │  WHISPER_*   │              │  (SttEngine)  │                │ (RecognitionProvider)│
//! └──────────────┘              └───────────────┘                └─────────────────────┘
//! ```
//!
//! ```rust,no_run
//! use interview_coach::stt::{SttEngine, TranscribeParams, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-base.en.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let audio: Vec<f32> = vec![0.0; 16_000]; // 1 s of silence
//! println!("{}", engine.transcribe(&audio).unwrap());
//! ```

pub mod engine;
pub mod model;
pub mod recognizer;

pub use engine::{clean_transcript, SamplingStrategy, SttEngine, SttError, TranscribeParams, WhisperEngine};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use recognizer::WhisperRecognizer;
