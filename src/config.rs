use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveSettings,
    pub media: MediaSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct LiveSettings {
    pub model: String,
    pub endpoint: String,
    /// Environment variable holding the API key. The key itself never lives
    /// in the config file.
    pub api_key_env: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub sample_rate: u32,
    pub frame: FrameSettings,
}

#[derive(Debug, Deserialize)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
    pub quality: f32,
    pub interval_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Resolve the API credential from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.live.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}
