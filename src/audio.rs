//! Audio fallback pipeline
//!
//! For sources without on-screen subtitles: capture audio, cut it into
//! bounded chunks, transcribe each chunk, and feed the transcript into
//! the same translation step as a caption. The recorder is rotated on a
//! fixed interval instead of streaming one unbounded take, which keeps
//! transcription latency and memory bounded.

use bytes::Bytes;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::SettingsStore;
use crate::error::{RelayError, Result};
use crate::pipeline::PipelineEvent;
use crate::provider::Translator;
use crate::transcribe;

/// One bounded-duration segment of captured audio. Consumed and
/// discarded after transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub data: Bytes,
    pub sequence: u64,
}

/// Capture device abstraction. The host supplies the concrete source
/// (tab capture bridge, microphone); the pipeline only needs encoded
/// bytes out of it.
pub trait AudioSource: Send + Sync {
    /// Acquire the device and begin buffering encoded audio
    fn start(&mut self) -> Result<()>;

    /// Drain everything buffered since the previous drain
    fn drain(&mut self) -> Bytes;

    /// Release the device. Must be safe to call repeatedly.
    fn stop(&mut self);
}

/// Capture session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped,
}

/// Rotates a capture source into bounded chunks
pub struct AudioChunker {
    source: Box<dyn AudioSource>,
    state: CaptureState,
    next_sequence: u64,
}

impl AudioChunker {
    pub fn new(source: Box<dyn AudioSource>) -> Self {
        Self {
            source,
            state: CaptureState::Idle,
            next_sequence: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Acquire the device. A capture failure is terminal: the chunker
    /// lands in `Stopped` and is not restarted.
    pub fn start(&mut self) -> Result<()> {
        match self.source.start() {
            Ok(()) => {
                self.state = CaptureState::Capturing;
                Ok(())
            }
            Err(e) => {
                self.state = CaptureState::Stopped;
                Err(match e {
                    failure @ RelayError::CaptureFailure(_) => failure,
                    other => RelayError::CaptureFailure(other.to_string()),
                })
            }
        }
    }

    /// Chunk boundary: hand out the audio recorded since the previous
    /// boundary. `None` while not capturing or when nothing was buffered.
    pub fn rotate(&mut self) -> Option<AudioChunk> {
        if self.state != CaptureState::Capturing {
            return None;
        }
        let data = self.source.drain();
        if data.is_empty() {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(AudioChunk { data, sequence })
    }

    /// Stop capturing. The partial chunk recorded since the last
    /// boundary is discarded, not transcribed, and the device is
    /// released unconditionally.
    pub fn stop(&mut self) {
        let _ = self.source.drain();
        self.source.stop();
        self.state = CaptureState::Stopped;
    }
}

impl Drop for AudioChunker {
    fn drop(&mut self) {
        if self.state == CaptureState::Capturing {
            self.stop();
        }
    }
}

/// Capture → transcribe → translate, converging on the same output
/// channel as the subtitle pipeline
pub struct AudioPipeline {
    chunker: AudioChunker,
    chunk_duration: Duration,
    settings: SettingsStore,
    translator: Translator,
    transcribe_endpoint: String,
    client: reqwest::Client,
}

impl AudioPipeline {
    pub fn new(
        chunker: AudioChunker,
        chunk_duration: Duration,
        settings: SettingsStore,
        translator: Translator,
    ) -> Self {
        Self {
            chunker,
            chunk_duration,
            settings,
            translator,
            transcribe_endpoint: transcribe::DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the transcription endpoint, for tests
    pub fn with_transcribe_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.transcribe_endpoint = endpoint.into();
        self
    }

    /// Run until shutdown. A capture start failure is returned
    /// immediately; per-chunk transcription or translation failures are
    /// reported on the output channel and capture continues.
    pub async fn run(
        mut self,
        out: mpsc::Sender<PipelineEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.chunker.start()?;
        tracing::info!("Audio capture started");

        let mut boundary = tokio::time::interval(self.chunk_duration);
        // The first interval tick completes immediately; consume it so
        // the first chunk spans a full duration.
        boundary.tick().await;

        loop {
            tokio::select! {
                _ = boundary.tick() => {
                    if let Some(chunk) = self.chunker.rotate() {
                        self.process_chunk(chunk, &out).await;
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown too.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.chunker.stop();
        tracing::info!("Audio capture stopped");
        Ok(())
    }

    async fn process_chunk(&self, chunk: AudioChunk, out: &mpsc::Sender<PipelineEvent>) {
        tracing::debug!(sequence = chunk.sequence, bytes = chunk.data.len(), "Chunk boundary");

        let settings = self.settings.snapshot();
        let transcription = match transcribe::transcribe_at(
            &self.client,
            &self.transcribe_endpoint,
            &settings.transcription,
            chunk.data,
        )
        .await
        {
            Ok(t) => t,
            Err(e) => {
                let _ = out.send(PipelineEvent::Error(e.to_string())).await;
                return;
            }
        };

        if transcription.text.trim().is_empty() {
            return;
        }

        let event = match self.translator.translate(transcription.text.trim()).await {
            Ok(result) => PipelineEvent::Translation(result),
            Err(e) => PipelineEvent::Error(e.to_string()),
        };
        let _ = out.send(event).await;
    }
}
