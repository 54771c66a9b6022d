//! Spoken interviewer replies.
//!
//! [`OpenAiSpeech`] fetches audio, [`AudioOutput`] plays it through rodio and
//! [`VoiceSynthesizer`] ties both to the [`crate::speech::SynthesisProvider`]
//! contract.  [`SilentSynthesizer`] stands in when playback is disabled.

pub mod client;
pub mod output;
pub mod synthesizer;

pub use client::{OpenAiSpeech, SpeechBackend};
pub use output::{AudioOutput, AudioPlayer, Clip};
pub use synthesizer::{SilentSynthesizer, VoiceSynthesizer};
