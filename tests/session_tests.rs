// Lifecycle tests for `AnalysisSession`, driven through mock media and live
// collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::{mpsc, Notify};

use facelive::codec::encode_base64;
use facelive::live::messages::KICKOFF_PROMPT;
use facelive::{
    AnalysisSession, AppEvent, AudioChunk, ConnectionState, FrameCaptureConfig, LiveConfig,
    LiveConnector, LiveEvent, LiveHandle, LiveSession, MediaBackend, MediaProvider, MediaStream,
    SessionConfig, SessionError, StateStore, ToolCall, VideoSource,
};

// ============================================================================
// Mocks
// ============================================================================

#[derive(Default)]
struct SentLog {
    audio: Vec<String>,
    frames: usize,
    texts: Vec<String>,
    tool_oks: Vec<(String, String)>,
    closed: bool,
}

type SharedLog = Arc<StdMutex<SentLog>>;

struct MockLiveSession {
    log: SharedLog,
    text_gate: Option<Arc<Notify>>,
}

#[async_trait::async_trait]
impl LiveSession for MockLiveSession {
    async fn send_audio(&mut self, base64_pcm: &str, _sample_rate: u32) -> Result<()> {
        self.log.lock().unwrap().audio.push(base64_pcm.to_string());
        Ok(())
    }

    async fn send_frame(&mut self, _jpeg: &[u8]) -> Result<()> {
        self.log.lock().unwrap().frames += 1;
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        if let Some(gate) = &self.text_gate {
            gate.notified().await;
        }
        self.log.lock().unwrap().texts.push(text.to_string());
        Ok(())
    }

    async fn send_tool_ok(&mut self, call_id: &str, name: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .tool_oks
            .push((call_id.to_string(), name.to_string()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

struct MockConnector {
    log: SharedLog,
    event_tx: Arc<StdMutex<Option<mpsc::Sender<LiveEvent>>>>,
    gate: Option<Arc<Notify>>,
    text_gate: Option<Arc<Notify>>,
    fail: bool,
}

#[async_trait::async_trait]
impl LiveConnector for MockConnector {
    async fn connect(&self, _config: &LiveConfig) -> Result<LiveHandle> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let (tx, rx) = mpsc::channel(8);
        *self.event_tx.lock().unwrap() = Some(tx);

        Ok(LiveHandle {
            session: Box::new(MockLiveSession {
                log: Arc::clone(&self.log),
                text_gate: self.text_gate.clone(),
            }),
            events: rx,
        })
    }
}

struct MockVideo {
    delay: Duration,
}

#[async_trait::async_trait]
impl VideoSource for MockVideo {
    async fn capture_jpeg(&self, _config: &FrameCaptureConfig) -> Result<Vec<u8>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(vec![0xff, 0xd8, 0xff])
    }
}

struct MockBackend {
    audio_rx: Option<mpsc::Receiver<AudioChunk>>,
    video_delay: Duration,
    stopped: Arc<AtomicBool>,
    fail_start: bool,
}

#[async_trait::async_trait]
impl MediaBackend for MockBackend {
    async fn start(&mut self) -> Result<MediaStream> {
        if self.fail_start {
            anyhow::bail!("camera permission denied");
        }
        let audio_rx = self.audio_rx.take().context("backend started twice")?;
        Ok(MediaStream {
            audio_rx,
            video: Arc::new(MockVideo {
                delay: self.video_delay,
            }),
        })
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockProvider {
    backend: StdMutex<Option<Box<dyn MediaBackend>>>,
    created: AtomicUsize,
}

impl MediaProvider for MockProvider {
    fn create(&self) -> Result<Box<dyn MediaBackend>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.backend
            .lock()
            .unwrap()
            .take()
            .context("no backend available")
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Opts {
    api_key: Option<String>,
    frame_interval: Duration,
    video_delay: Duration,
    gated: bool,
    gate_kickoff: bool,
    fail_connect: bool,
    fail_media_start: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            api_key: Some("test-key".to_string()),
            frame_interval: Duration::from_millis(500),
            video_delay: Duration::ZERO,
            gated: false,
            gate_kickoff: false,
            fail_connect: false,
            fail_media_start: false,
        }
    }
}

struct Harness {
    session: Arc<AnalysisSession>,
    store: Arc<StateStore>,
    log: SharedLog,
    audio_tx: mpsc::Sender<AudioChunk>,
    event_tx: Arc<StdMutex<Option<mpsc::Sender<LiveEvent>>>>,
    media_stopped: Arc<AtomicBool>,
    provider: Arc<MockProvider>,
    gate: Option<Arc<Notify>>,
    kickoff_gate: Option<Arc<Notify>>,
}

impl Harness {
    fn events(&self) -> mpsc::Sender<LiveEvent> {
        self.event_tx
            .lock()
            .unwrap()
            .clone()
            .expect("live session not connected")
    }
}

fn build(opts: Opts) -> Harness {
    let log: SharedLog = Arc::default();
    let (audio_tx, audio_rx) = mpsc::channel(32);
    let media_stopped = Arc::new(AtomicBool::new(false));

    let backend = MockBackend {
        audio_rx: Some(audio_rx),
        video_delay: opts.video_delay,
        stopped: Arc::clone(&media_stopped),
        fail_start: opts.fail_media_start,
    };
    let provider = Arc::new(MockProvider {
        backend: StdMutex::new(Some(Box::new(backend) as Box<dyn MediaBackend>)),
        created: AtomicUsize::new(0),
    });

    let event_tx = Arc::new(StdMutex::new(None));
    let gate = opts.gated.then(|| Arc::new(Notify::new()));
    let kickoff_gate = opts.gate_kickoff.then(|| Arc::new(Notify::new()));
    let connector = Arc::new(MockConnector {
        log: Arc::clone(&log),
        event_tx: Arc::clone(&event_tx),
        gate: gate.clone(),
        text_gate: kickoff_gate.clone(),
        fail: opts.fail_connect,
    });

    let store = Arc::new(StateStore::new());
    let config = SessionConfig {
        api_key: opts.api_key,
        frame_interval: opts.frame_interval,
        ..SessionConfig::default()
    };

    let session = Arc::new(AnalysisSession::new(
        config,
        Arc::clone(&provider) as Arc<dyn MediaProvider>,
        connector,
        Arc::clone(&store),
    ));

    Harness {
        session,
        store,
        log,
        audio_tx,
        event_tx,
        media_stopped,
        provider,
        gate,
        kickoff_gate,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_without_credential_refuses() {
    let h = build(Opts {
        api_key: None,
        ..Default::default()
    });

    let err = h.session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::MissingCredential));

    // Never even reaches Connecting, and nothing is acquired.
    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);
    assert_eq!(h.provider.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connect_reaches_connected_and_sends_kickoff() {
    let h = build(Opts::default());

    h.session.connect().await.unwrap();

    assert_eq!(h.store.snapshot().connection, ConnectionState::Connected);
    assert_eq!(
        h.log.lock().unwrap().texts,
        vec![KICKOFF_PROMPT.to_string()]
    );
}

#[tokio::test]
async fn test_second_connect_keeps_existing_session() {
    let h = build(Opts::default());

    h.session.connect().await.unwrap();
    h.session.connect().await.unwrap();

    assert_eq!(h.provider.created.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.snapshot().connection, ConnectionState::Connected);
}

#[tokio::test]
async fn test_audio_chunks_are_encoded_and_forwarded() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    let samples = vec![0.25f32; 160];
    h.audio_tx
        .send(AudioChunk {
            samples: samples.clone(),
            sample_rate: 16000,
        })
        .await
        .unwrap();

    wait_until(|| h.log.lock().unwrap().audio.len() == 1).await;
    assert_eq!(h.log.lock().unwrap().audio[0], encode_base64(&samples));
}

#[tokio::test]
async fn test_muted_mic_drops_audio() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.store.dispatch(AppEvent::ToggleMic);
    h.audio_tx
        .send(AudioChunk {
            samples: vec![0.5f32; 160],
            sample_rate: 16000,
        })
        .await
        .unwrap();

    // Give the forwarder time to consume (and drop) the muted chunk.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.log.lock().unwrap().audio.is_empty());

    // Unmuting resumes forwarding; the dropped chunk never shows up.
    h.store.dispatch(AppEvent::ToggleMic);
    let audible = vec![0.75f32; 160];
    h.audio_tx
        .send(AudioChunk {
            samples: audible.clone(),
            sample_rate: 16000,
        })
        .await
        .unwrap();

    wait_until(|| !h.log.lock().unwrap().audio.is_empty()).await;
    assert_eq!(
        h.log.lock().unwrap().audio,
        vec![encode_base64(&audible)]
    );
}

#[tokio::test]
async fn test_tool_call_updates_state_and_is_acknowledged() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.events()
        .send(LiveEvent::ToolCall(ToolCall {
            id: "call-1".to_string(),
            name: "report_analysis".to_string(),
            args: json!({ "dominant_emotion": "Joy", "baseline_deviation": 12.0 }),
        }))
        .await
        .unwrap();

    wait_until(|| h.log.lock().unwrap().tool_oks.len() == 1).await;

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.timeline.len(), 1);
    assert_eq!(snapshot.current.unwrap().dominant_emotion, "Joy");
    assert_eq!(
        h.log.lock().unwrap().tool_oks,
        vec![("call-1".to_string(), "report_analysis".to_string())]
    );
}

#[tokio::test]
async fn test_unexpected_tool_call_is_acknowledged_but_ignored() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.events()
        .send(LiveEvent::ToolCall(ToolCall {
            id: "call-9".to_string(),
            name: "some_other_tool".to_string(),
            args: serde_json::Value::Null,
        }))
        .await
        .unwrap();

    wait_until(|| h.log.lock().unwrap().tool_oks.len() == 1).await;
    assert!(h.store.snapshot().history.is_empty());
}

#[tokio::test]
async fn test_remote_close_tears_down_to_disconnected() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.events().send(LiveEvent::Closed).await.unwrap();

    wait_until(|| h.store.snapshot().connection == ConnectionState::Disconnected).await;
    assert!(h.media_stopped.load(Ordering::SeqCst));
    assert!(h.log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_remote_error_tears_down_to_error() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.events()
        .send(LiveEvent::Error("quota exceeded".to_string()))
        .await
        .unwrap();

    wait_until(|| h.store.snapshot().connection == ConnectionState::Error).await;
    assert!(h.media_stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_disconnect_is_idempotent_when_disconnected() {
    let h = build(Opts::default());

    h.session.disconnect().await;
    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);

    h.session.disconnect().await;
    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);
    assert_eq!(h.provider.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disconnect_releases_everything() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    h.session.disconnect().await;

    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);
    assert!(h.media_stopped.load(Ordering::SeqCst));
    assert!(h.log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_media_start_failure_sets_error_state() {
    let h = build(Opts {
        fail_media_start: true,
        ..Default::default()
    });

    let err = h.session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::MediaAccess(_)));
    assert_eq!(h.store.snapshot().connection, ConnectionState::Error);
}

#[tokio::test]
async fn test_live_open_failure_sets_error_state_and_releases_media() {
    let h = build(Opts {
        fail_connect: true,
        ..Default::default()
    });

    let err = h.session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::Live(_)));
    assert_eq!(h.store.snapshot().connection, ConnectionState::Error);
    assert!(h.media_stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_disconnect_during_connect_discards_stale_completion() {
    let h = build(Opts {
        gated: true,
        ..Default::default()
    });

    let session = Arc::clone(&h.session);
    let connect_task = tokio::spawn(async move { session.connect().await });

    // Let the connect attempt reach the gated session open, then cancel it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.session.disconnect().await;
    h.gate.as_ref().unwrap().notify_one();

    connect_task.await.unwrap().unwrap();

    // The stale completion released its acquisitions and never went live.
    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);
    assert!(h.log.lock().unwrap().closed);
    assert!(h.media_stopped.load(Ordering::SeqCst));
    assert!(h.log.lock().unwrap().texts.is_empty());
}

#[tokio::test]
async fn test_disconnect_racing_connect_tail_ends_disconnected() {
    let h = build(Opts {
        gate_kickoff: true,
        ..Default::default()
    });

    let session = Arc::clone(&h.session);
    let connect_task = tokio::spawn(async move { session.connect().await });

    // Connect has activated and is now blocked inside the kickoff send.
    wait_until(|| h.store.snapshot().connection == ConnectionState::Connected).await;

    let session = Arc::clone(&h.session);
    let disconnect_task = tokio::spawn(async move { session.disconnect().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.kickoff_gate.as_ref().unwrap().notify_one();

    connect_task.await.unwrap().unwrap();
    disconnect_task.await.unwrap();

    // Disconnected wins: the indicator never pins on Connected once the
    // session is gone.
    assert_eq!(h.store.snapshot().connection, ConnectionState::Disconnected);
    assert!(h.log.lock().unwrap().closed);
    assert!(h.media_stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_frame_sampler_sends_at_interval() {
    let h = build(Opts::default());
    h.session.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2600)).await;

    let frames = h.log.lock().unwrap().frames;
    assert!((4..=6).contains(&frames), "expected ~5 frames, got {frames}");
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_video_ticks_are_skipped() {
    let h = build(Opts {
        video_delay: Duration::from_millis(1200),
        ..Default::default()
    });
    h.session.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(6000)).await;

    // Captures take 1200ms against a 500ms tick: ticks firing while a capture
    // is in flight are dropped, not queued. A naive sampler would send ~11.
    let frames = h.log.lock().unwrap().frames;
    assert!(frames >= 2, "sampler must make progress, got {frames}");
    assert!(frames <= 4, "overlapping ticks must be dropped, got {frames}");
}
