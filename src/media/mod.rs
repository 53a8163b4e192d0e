pub mod backend;
pub mod synthetic;

pub use backend::{
    AudioChunk, FrameCaptureConfig, MediaBackend, MediaBackendFactory, MediaProvider, MediaSource,
    MediaStream, SourceMediaProvider, VideoSource,
};
pub use synthetic::SyntheticBackend;
