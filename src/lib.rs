//! Mock technical interviews with a conversational AI interviewer.
//!
//! ```text
//!  app (egui) ──► session::SessionOrchestrator ──► agent::ConversationAgent
//!                        │            │
//!             speech::SpeechCapture  speech::SpeechPlayback
//!                        │            │
//!           stt::WhisperRecognizer  tts::VoiceSynthesizer
//!                        │            │
//!                     audio (cpal)   rodio
//! ```

pub mod agent;
pub mod app;
pub mod audio;
pub mod config;
pub mod resume;
pub mod session;
pub mod speech;
pub mod stt;
pub mod tts;
