//! Microphone capture via `cpal`.
//!
//! [`Microphone`] wraps the cpal host/device/stream lifecycle.  Call
//! [`Microphone::start`] to begin streaming [`AudioChunk`]s over an mpsc
//! channel.  The returned [`StreamHandle`] is a RAII guard; dropping it
//! stops the underlying cpal stream.
//!
//! Devices that only offer integer sample formats are converted to `f32`
//! in the callback.

use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One buffer of audio as delivered by the cpal callback.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

/// Keeps the cpal stream alive.  Not `Send` on every platform, so it must
/// stay on the thread that created it.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// MicrophoneError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MicrophoneError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Microphone
// ---------------------------------------------------------------------------

/// The system default input device.
pub struct Microphone {
    device: cpal::Device,
    config: cpal::StreamConfig,
    format: SampleFormat,
    sample_rate: u32,
    channels: u16,
}

impl Microphone {
    /// Open the default input device with its preferred configuration.
    pub fn open_default() -> Result<Self, MicrophoneError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(MicrophoneError::NoDevice)?;

        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;

        if let Ok(name) = device.name() {
            log::debug!("capture: input device {name:?} {sample_rate} Hz x{channels} {format:?}");
        }

        Ok(Self {
            device,
            config: supported.into(),
            format,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send [`AudioChunk`]s to `tx`.
    ///
    /// Send errors (receiver dropped) are ignored so the audio thread never
    /// panics.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, MicrophoneError> {
        let stream = match self.format {
            SampleFormat::F32 => self.build::<f32>(tx)?,
            SampleFormat::I16 => self.build::<i16>(tx)?,
            SampleFormat::U16 => self.build::<u16>(tx)?,
            SampleFormat::I32 => self.build::<i32>(tx)?,
            other => return Err(MicrophoneError::UnsupportedFormat(other)),
        };
        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    fn build<T>(&self, tx: mpsc::Sender<AudioChunk>) -> Result<cpal::Stream, MicrophoneError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.iter().map(|s| s.to_sample::<f32>()).collect(),
                    sample_rate,
                    channels,
                };
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
            },
            None,
        )?;
        Ok(stream)
    }

    /// Native sample rate in Hz (commonly 44 100 or 48 000).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Chunks cross from the cpal callback thread to the recogniser thread.
    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn integer_samples_convert_to_unit_range() {
        assert_eq!(0i16.to_sample::<f32>(), 0.0);
        assert!((i16::MIN.to_sample::<f32>() + 1.0).abs() < 1e-4);
        assert!((u16::MAX.to_sample::<f32>() - 1.0).abs() < 1e-3);
    }
}
