// Tests for configuration loading and credential resolution.

use facelive::Config;

const CONFIG_TOML: &str = r#"
[service]
name = "facelive-test"

[service.http]
bind = "127.0.0.1"
port = 8787

[live]
model = "models/gemini-2.0-flash-exp"
endpoint = "wss://example.invalid/live"
api_key_env = "FACELIVE_TEST_API_KEY"

[media]
sample_rate = 16000

[media.frame]
width = 320
height = 240
quality = 0.6
interval_ms = 500
"#;

fn write_config(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("facelive.toml");
    std::fs::write(&path, CONFIG_TOML).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_load_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load(&write_config(&dir)).unwrap();

    assert_eq!(cfg.service.name, "facelive-test");
    assert_eq!(cfg.service.http.port, 8787);
    assert_eq!(cfg.live.api_key_env, "FACELIVE_TEST_API_KEY");
    assert_eq!(cfg.media.sample_rate, 16000);
    assert_eq!(cfg.media.frame.width, 320);
    assert_eq!(cfg.media.frame.height, 240);
    assert_eq!(cfg.media.frame.interval_ms, 500);
}

#[test]
fn test_load_missing_file_fails() {
    assert!(Config::load("/nonexistent/facelive").is_err());
}

#[test]
fn test_api_key_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load(&write_config(&dir)).unwrap();

    std::env::remove_var("FACELIVE_TEST_API_KEY");
    assert!(cfg.api_key().is_none());

    std::env::set_var("FACELIVE_TEST_API_KEY", "");
    assert!(cfg.api_key().is_none(), "empty key counts as absent");

    std::env::set_var("FACELIVE_TEST_API_KEY", "test-key");
    assert_eq!(cfg.api_key().as_deref(), Some("test-key"));

    std::env::remove_var("FACELIVE_TEST_API_KEY");
}
