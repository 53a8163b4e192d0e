use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

/// One buffer of captured microphone audio (f32 mono samples).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Bounds applied to every captured video frame before transmission.
///
/// Frames are downsampled and recompressed at the source so a single payload
/// stays small regardless of the camera's native resolution.
#[derive(Debug, Clone)]
pub struct FrameCaptureConfig {
    /// Target frame width in pixels
    pub width: u32,
    /// Target frame height in pixels
    pub height: u32,
    /// JPEG quality, 0.0-1.0
    pub quality: f32,
}

impl Default for FrameCaptureConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            quality: 0.6,
        }
    }
}

/// Frame-grab access to the live video feed.
///
/// Grabs are on-demand: the session's frame sampler decides when to capture,
/// the source only has to produce the current frame as JPEG bytes within the
/// requested bounds.
#[async_trait::async_trait]
pub trait VideoSource: Send + Sync {
    async fn capture_jpeg(&self, config: &FrameCaptureConfig) -> Result<Vec<u8>>;
}

/// Everything a started backend hands to the session: the audio channel and
/// shared frame-grab access.
pub struct MediaStream {
    /// Receives audio chunks in capture order
    pub audio_rx: mpsc::Receiver<AudioChunk>,
    /// Live video feed for on-demand frame grabs
    pub video: Arc<dyn VideoSource>,
}

/// Camera+microphone capture backend trait.
///
/// Implementations:
/// - Synthetic: timed silent audio plus a placeholder frame (tests/dev)
/// - Device capture is platform-specific work behind this same trait
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Acquire the devices and start capturing.
    async fn start(&mut self) -> Result<MediaStream>;

    /// Stop capturing and release every acquired device resource.
    ///
    /// Must be safe to call when capture never started.
    async fn stop(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Media source type
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Synthetic capture (tests/development, no devices required)
    Synthetic,
    /// Real camera + microphone devices
    Device,
}

/// Media backend factory
pub struct MediaBackendFactory;

impl MediaBackendFactory {
    pub fn create(source: MediaSource, sample_rate: u32) -> Result<Box<dyn MediaBackend>> {
        match source {
            MediaSource::Synthetic => Ok(Box::new(super::synthetic::SyntheticBackend::new(
                sample_rate,
            ))),

            MediaSource::Device => {
                anyhow::bail!("device capture is not supported on this platform yet")
            }
        }
    }
}

/// Creates a fresh capture backend for each connect attempt.
///
/// The session goes through this seam rather than the factory directly so
/// tests can hand it prepared backends.
pub trait MediaProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn MediaBackend>>;
}

/// Default provider: builds backends from a [`MediaSource`] via the factory.
pub struct SourceMediaProvider {
    source: MediaSource,
    sample_rate: u32,
}

impl SourceMediaProvider {
    pub fn new(source: MediaSource, sample_rate: u32) -> Self {
        Self {
            source,
            sample_rate,
        }
    }
}

impl MediaProvider for SourceMediaProvider {
    fn create(&self) -> Result<Box<dyn MediaBackend>> {
        MediaBackendFactory::create(self.source.clone(), self.sample_rate)
    }
}
