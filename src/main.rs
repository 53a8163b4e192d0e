use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use facelive::{
    create_router, AnalysisSession, ApiState, Config, FrameCaptureConfig, GeminiLiveConnector,
    MediaSource, SessionConfig, SourceMediaProvider, StateStore,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "facelive", about = "Real-time facial/audio analysis session core")]
struct Cli {
    /// Config file path (extension resolved by the config loader)
    #[arg(long, default_value = "config/facelive")]
    config: String,

    /// Use the synthetic capture backend instead of real devices
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("facelive v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let api_key = cfg.api_key();
    if api_key.is_none() {
        warn!(
            "{} is not set; connect requests will be refused",
            cfg.live.api_key_env
        );
    }

    let session_config = SessionConfig {
        endpoint: cfg.live.endpoint.clone(),
        model: cfg.live.model.clone(),
        api_key,
        frame: FrameCaptureConfig {
            width: cfg.media.frame.width,
            height: cfg.media.frame.height,
            quality: cfg.media.frame.quality,
        },
        frame_interval: Duration::from_millis(cfg.media.frame.interval_ms),
        ..SessionConfig::default()
    };

    let media_source = if cli.synthetic {
        MediaSource::Synthetic
    } else {
        MediaSource::Device
    };

    let media = Arc::new(SourceMediaProvider::new(
        media_source,
        cfg.media.sample_rate,
    ));

    let store = Arc::new(StateStore::new());
    let session = Arc::new(AnalysisSession::new(
        session_config,
        media,
        Arc::new(GeminiLiveConnector),
        store,
    ));

    let app = create_router(ApiState { session });

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
