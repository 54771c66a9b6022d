//! Channel mixing and streaming sample-rate conversion.
//!
//! Whisper wants **16 kHz mono `f32`**.  Microphone chunks arrive at the
//! device rate with interleaved channels, so each chunk goes through
//! [`downmix`] and then a [`StreamResampler`], which keeps a rubato
//! FFT resampler and the leftover input between chunks.

use rubato::{FftFixedIn, Resampler};
use thiserror::Error;

/// Sample rate expected by Whisper.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Input frames handed to rubato per call.
const CHUNK_FRAMES: usize = 1_024;

// ---------------------------------------------------------------------------
// downmix
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// Output length is `samples.len() / channels`; `channels == 0` yields an
/// empty vector.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// StreamResampler
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("cannot build resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Converts an unbounded mono stream to 16 kHz.
///
/// Input is buffered until a full rubato chunk is available; call
/// [`flush`](Self::flush) at the end of the stream for the remainder.
pub struct StreamResampler {
    /// `None` when the source is already 16 kHz.
    inner: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32) -> Result<Self, ResampleError> {
        let inner = if source_rate == WHISPER_SAMPLE_RATE {
            None
        } else {
            Some(FftFixedIn::<f32>::new(
                source_rate as usize,
                WHISPER_SAMPLE_RATE as usize,
                CHUNK_FRAMES,
                2,
                1,
            )?)
        };
        Ok(Self {
            inner,
            pending: Vec::with_capacity(CHUNK_FRAMES * 2),
        })
    }

    /// Feed mono samples; returns whatever 16 kHz output is ready.
    pub fn push(&mut self, mono: &[f32]) -> Result<Vec<f32>, ResampleError> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(mono.to_vec());
        };

        self.pending.extend_from_slice(mono);
        let mut out = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let input = [self.pending.drain(..needed).collect::<Vec<f32>>()];
            let mut frames = resampler.process(&input[..], None)?;
            out.append(&mut frames[0]);
        }
        Ok(out)
    }

    /// Resample any buffered remainder, zero-padded to a full chunk.
    pub fn flush(&mut self) -> Result<Vec<f32>, ResampleError> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let input = [std::mem::take(&mut self.pending)];
        let mut frames = resampler.process_partial(Some(&input[..]), None)?;
        Ok(std::mem::take(&mut frames[0]))
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- downmix -----------------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix(&input, 1), input);
    }

    #[test]
    fn downmix_two_channel() {
        let out = downmix(&[1.0_f32, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let out = downmix(&[0.4_f32, 0.4, 0.4], 2);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn downmix_zero_channels() {
        assert!(downmix(&[1.0_f32, 2.0], 0).is_empty());
    }

    // ---- StreamResampler ---------------------------------------------------

    #[test]
    fn sixteen_khz_is_passthrough() {
        let mut r = StreamResampler::new(16_000).unwrap();
        assert!(r.is_passthrough());
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(r.push(&input).unwrap(), input);
        assert!(r.flush().unwrap().is_empty());
    }

    #[test]
    fn small_pushes_are_buffered() {
        let mut r = StreamResampler::new(48_000).unwrap();
        assert!(r.push(&[0.0_f32; 10]).unwrap().is_empty());
    }

    #[test]
    fn one_second_at_48k_yields_about_one_second_at_16k() {
        let mut r = StreamResampler::new(48_000).unwrap();
        let mut out = Vec::new();
        // Odd-sized chunks, like a real device callback.
        for _ in 0..100 {
            out.extend(r.push(&[0.25_f32; 480]).unwrap());
        }
        out.extend(r.flush().unwrap());
        assert!(
            (15_000..=17_000).contains(&out.len()),
            "expected ~16000 samples, got {}",
            out.len()
        );
    }

    #[test]
    fn downsampling_44k1_produces_fewer_samples() {
        let mut r = StreamResampler::new(44_100).unwrap();
        let out = r.push(&vec![0.0_f32; 44_100]).unwrap();
        assert!(!out.is_empty());
        assert!(out.len() < 16_500, "got {}", out.len());
    }
}
