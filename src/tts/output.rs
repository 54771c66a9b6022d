//! Audio output via `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so [`AudioOutput`] parks it on a
//! dedicated thread and keeps only the (sendable) `OutputStreamHandle`.
//! Dropping the `AudioOutput` releases the thread and the device.

use std::io::Cursor;
use std::sync::{mpsc, Arc};

use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::speech::PlaybackError;

/// One clip handed to the output device.
pub trait Clip: Send + Sync {
    /// Playback ran to the end (or was stopped).
    fn is_finished(&self) -> bool;
    fn stop(&self);
}

impl Clip for Sink {
    fn is_finished(&self) -> bool {
        self.empty()
    }

    fn stop(&self) {
        Sink::stop(self);
    }
}

/// Plays encoded audio.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> Result<Arc<dyn Clip>, PlaybackError>;
}

/// The default output device.
pub struct AudioOutput {
    handle: OutputStreamHandle,
    /// Dropping this ends the stream thread.
    _keepalive: mpsc::Sender<()>,
}

impl AudioOutput {
    pub fn open_default() -> Result<Self, PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (keepalive, parked) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Blocks until every sender is gone.
                    let _ = parked.recv();
                    log::debug!("output: stream thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                }
            })
            .map_err(|e| PlaybackError::Output(format!("failed to spawn output thread: {e}")))?;

        let handle = ready_rx
            .recv()
            .map_err(|_| PlaybackError::Output("output thread exited".into()))??;
        log::info!("output: default audio device ready");

        Ok(Self {
            handle,
            _keepalive: keepalive,
        })
    }
}

impl AudioPlayer for AudioOutput {
    fn play(&self, audio: Vec<u8>) -> Result<Arc<dyn Clip>, PlaybackError> {
        let source =
            rodio::Decoder::new(Cursor::new(audio)).map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let sink = Sink::try_new(&self.handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.append(source);
        Ok(Arc::new(sink))
    }
}
