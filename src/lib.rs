pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod media;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, ApiState};
pub use live::{
    GeminiLiveConnector, LiveConfig, LiveConnector, LiveEvent, LiveHandle, LiveSession, ToolCall,
};
pub use media::{
    AudioChunk, FrameCaptureConfig, MediaBackend, MediaBackendFactory, MediaProvider, MediaSource,
    MediaStream, SourceMediaProvider, SyntheticBackend, VideoSource,
};
pub use session::{AnalysisSession, SessionConfig};
pub use state::{
    reduce, AnalysisFrame, AnalysisReport, AppEvent, AppState, ConnectionState, EmotionPoint,
    StateStore,
};
