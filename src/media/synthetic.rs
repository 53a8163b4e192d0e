use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{
    AudioChunk, FrameCaptureConfig, MediaBackend, MediaStream, VideoSource,
};

/// Chunk cadence of the synthetic microphone.
const CHUNK_INTERVAL_MS: u64 = 100;

/// Synthetic camera+microphone backend.
///
/// Emits silent audio chunks on a fixed cadence and a fixed placeholder frame
/// payload on demand. Exists so the session pipeline can run end-to-end in
/// tests and development environments without capture devices.
pub struct SyntheticBackend {
    sample_rate: u32,
    audio_task: Option<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            audio_task: None,
        }
    }
}

#[async_trait::async_trait]
impl MediaBackend for SyntheticBackend {
    async fn start(&mut self) -> Result<MediaStream> {
        info!(sample_rate = self.sample_rate, "starting synthetic capture");

        let (audio_tx, audio_rx) = mpsc::channel(32);
        let samples_per_chunk = (self.sample_rate as u64 * CHUNK_INTERVAL_MS / 1000) as usize;
        let sample_rate = self.sample_rate;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(CHUNK_INTERVAL_MS));
            loop {
                interval.tick().await;
                let chunk = AudioChunk {
                    samples: vec![0.0; samples_per_chunk],
                    sample_rate,
                };
                if audio_tx.send(chunk).await.is_err() {
                    debug!("audio receiver dropped, stopping synthetic capture");
                    break;
                }
            }
        });

        self.audio_task = Some(task);

        Ok(MediaStream {
            audio_rx,
            video: Arc::new(SyntheticVideo),
        })
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.audio_task.take() {
            task.abort();
            info!("synthetic capture stopped");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Placeholder video feed. The payload is a fixed byte pattern, not a real
/// encoded frame; the transport treats frame payloads as opaque bytes.
struct SyntheticVideo;

#[async_trait::async_trait]
impl VideoSource for SyntheticVideo {
    async fn capture_jpeg(&self, config: &FrameCaptureConfig) -> Result<Vec<u8>> {
        // Sized roughly like a real low-quality frame at the configured bounds.
        let len = (config.width * config.height / 16) as usize;
        Ok(vec![0x7f; len.max(64)])
    }
}
