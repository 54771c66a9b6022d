//! Speech coordination: capture, playback and the text/voice composer.
//!
//! The types here hold state and apply provider events; they never touch
//! audio hardware themselves.  Production providers live in
//! [`crate::stt`] (recognition) and [`crate::tts`] (synthesis).

pub mod capture;
pub mod composer;
pub mod playback;

pub use capture::{
    CaptureError, CaptureTransition, PassId, RecognitionEvent, RecognitionProvider,
    SpeechCapture, UnavailableRecognizer,
};
pub use composer::Composer;
pub use playback::{
    PlaybackError, PlaybackTransition, SpeechPlayback, SynthesisEvent, SynthesisProvider,
    UtteranceId,
};
