use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use crate::codec;
use crate::error::SessionError;
use crate::live::messages::KICKOFF_PROMPT;
use crate::live::{LiveConfig, LiveConnector, LiveEvent, LiveHandle, LiveSession, ANALYSIS_TOOL};
use crate::media::{AudioChunk, MediaBackend, MediaProvider, VideoSource};
use crate::state::{AnalysisFrame, AppEvent, ConnectionState, StateStore};

type SharedLiveSession = Arc<Mutex<Box<dyn LiveSession>>>;

/// An analysis session that manages media capture, the remote live session,
/// and the producer loops feeding it.
///
/// Connection state lives in the [`StateStore`]; this type owns the media and
/// session handles and the spawned tasks, with a documented teardown order.
pub struct AnalysisSession {
    /// Session configuration
    config: SessionConfig,

    /// Creates the capture backend acquired on connect
    media: Arc<dyn MediaProvider>,

    /// Opens live sessions (swapped for a mock in tests)
    connector: Arc<dyn LiveConnector>,

    /// Owner of the aggregate dashboard state
    store: Arc<StateStore>,

    /// Resources of the currently active session, if any
    active: Mutex<Option<ActiveSession>>,

    /// Connect attempt generation. Bumped by `disconnect()` so an in-flight
    /// connect that completes after teardown began discards its acquisitions
    /// instead of resurrecting torn-down state.
    generation: AtomicU64,
}

/// Everything a connected session holds, torn down as one unit.
struct ActiveSession {
    generation: u64,
    backend: Box<dyn MediaBackend>,
    session: SharedLiveSession,
    audio_task: JoinHandle<()>,
    video_task: JoinHandle<()>,
    event_task: JoinHandle<()>,
}

impl AnalysisSession {
    pub fn new(
        config: SessionConfig,
        media: Arc<dyn MediaProvider>,
        connector: Arc<dyn LiveConnector>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            config,
            media,
            connector,
            store,
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Acquire media, open the live session, and start both producer loops.
    ///
    /// Refuses to start without a credential (state stays Disconnected and
    /// nothing is acquired). Media or session failures tear down whatever was
    /// acquired and leave the state indicator on Error.
    pub async fn connect(self: &Arc<Self>) -> Result<(), SessionError> {
        let api_key = match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => {
                warn!("connect refused: no API credential configured");
                return Err(SessionError::MissingCredential);
            }
        };

        {
            let active = self.active.lock().await;
            if active.is_some() {
                warn!("session already active");
                return Ok(());
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!(session_id = %self.config.session_id, "connecting");
        self.store
            .dispatch(AppEvent::SetConnectionState(ConnectionState::Connecting));

        // Acquire camera + microphone.
        let mut backend =
            match self.media.create() {
                Ok(backend) => backend,
                Err(e) => {
                    error!("media backend creation failed: {e:#}");
                    if !self.is_stale(generation) {
                        self.store
                            .dispatch(AppEvent::SetConnectionState(ConnectionState::Error));
                    }
                    return Err(SessionError::MediaAccess(e.to_string()));
                }
            };

        let stream = match backend.start().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("media capture failed to start: {e:#}");
                let _ = backend.stop().await;
                if !self.is_stale(generation) {
                    self.store
                        .dispatch(AppEvent::SetConnectionState(ConnectionState::Error));
                }
                return Err(SessionError::MediaAccess(e.to_string()));
            }
        };

        if self.is_stale(generation) {
            debug!("connect superseded during media acquisition, discarding");
            let _ = backend.stop().await;
            return Ok(());
        }

        // Open the remote live session.
        let live_config = LiveConfig {
            endpoint: self.config.endpoint.clone(),
            model: self.config.model.clone(),
            api_key,
        };

        let handle = match self.connector.connect(&live_config).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("live session open failed: {e:#}");
                let _ = backend.stop().await;
                if !self.is_stale(generation) {
                    self.store
                        .dispatch(AppEvent::SetConnectionState(ConnectionState::Error));
                }
                return Err(SessionError::Live(e.to_string()));
            }
        };

        let LiveHandle {
            mut session,
            events,
        } = handle;

        if self.is_stale(generation) {
            debug!("connect superseded during session open, discarding");
            let _ = session.close().await;
            let _ = backend.stop().await;
            return Ok(());
        }

        let session: SharedLiveSession = Arc::new(Mutex::new(session));

        let audio_task = self.spawn_audio_forwarder(stream.audio_rx, Arc::clone(&session));
        let video_task = self.spawn_frame_sampler(stream.video, Arc::clone(&session));
        let event_task = self.spawn_event_loop(events, Arc::clone(&session), generation);

        {
            let mut active = self.active.lock().await;
            if self.is_stale(generation) {
                drop(active);
                debug!("connect superseded before activation, discarding");
                audio_task.abort();
                video_task.abort();
                event_task.abort();
                let _ = session.lock().await.close().await;
                let _ = backend.stop().await;
                return Ok(());
            }
            *active = Some(ActiveSession {
                generation,
                backend,
                session: Arc::clone(&session),
                audio_task,
                video_task,
                event_task,
            });

            // Dispatched while the lock is still held: a disconnect landing
            // after this point has to take the installed session first, so
            // its Disconnected dispatch always follows this one.
            self.store
                .dispatch(AppEvent::SetConnectionState(ConnectionState::Connected));
        }

        info!("session connected");

        // Prime the model. It only analyzes proactively once it has seen a
        // user turn; without this it idles waiting for speech.
        if self.is_stale(generation) {
            debug!("connect superseded before kickoff, skipping");
            return Ok(());
        }
        if let Err(e) = session.lock().await.send_text(KICKOFF_PROMPT).await {
            warn!("kickoff send failed: {e:#}");
        }

        Ok(())
    }

    /// Stop both producers, release media and session resources, and return
    /// to Disconnected. Idempotent; also cancels an in-flight connect.
    pub async fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.teardown(None, ConnectionState::Disconnected, false)
            .await;
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Forward captured audio in delivery order. Muted mic consumes the chunk
    /// and produces nothing; send failures are logged and swallowed.
    fn spawn_audio_forwarder(
        &self,
        mut audio_rx: mpsc::Receiver<AudioChunk>,
        session: SharedLiveSession,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            debug!("audio forwarder started");

            while let Some(chunk) = audio_rx.recv().await {
                if !store.mic_enabled() {
                    continue;
                }

                let payload = codec::encode_base64(&chunk.samples);
                if payload.is_empty() {
                    continue;
                }

                if let Err(e) = session
                    .lock()
                    .await
                    .send_audio(&payload, chunk.sample_rate)
                    .await
                {
                    warn!("audio send failed: {e:#}");
                }
            }

            debug!("audio forwarder stopped");
        })
    }

    /// Capture and send one frame per interval tick. A non-blocking
    /// try-acquire around the capture-and-send task drops ticks that overlap
    /// an in-flight capture — frames may be skipped, never reordered,
    /// duplicated, or queued.
    fn spawn_frame_sampler(
        &self,
        video: Arc<dyn VideoSource>,
        session: SharedLiveSession,
    ) -> JoinHandle<()> {
        let frame_config = self.config.frame.clone();
        let period = self.config.frame_interval;

        tokio::spawn(async move {
            debug!("frame sampler started");

            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let in_flight = Arc::new(Semaphore::new(1));

            loop {
                interval.tick().await;

                let Ok(permit) = Arc::clone(&in_flight).try_acquire_owned() else {
                    debug!("frame capture still in flight, skipping tick");
                    continue;
                };

                let video = Arc::clone(&video);
                let session = Arc::clone(&session);
                let frame_config = frame_config.clone();

                tokio::spawn(async move {
                    let _permit = permit;

                    let jpeg = match video.capture_jpeg(&frame_config).await {
                        Ok(jpeg) => jpeg,
                        Err(e) => {
                            warn!("frame capture failed: {e:#}");
                            return;
                        }
                    };

                    if let Err(e) = session.lock().await.send_frame(&jpeg).await {
                        warn!("frame send failed: {e:#}");
                    }
                });
            }
        })
    }

    /// Handle remote events in arrival order. Tool calls are decoded, fed to
    /// the reducer, and acknowledged before the next event is processed.
    fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<LiveEvent>,
        session: SharedLiveSession,
        generation: u64,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let manager = Arc::downgrade(self);

        tokio::spawn(async move {
            debug!("event loop started");

            let final_state = loop {
                match events.recv().await {
                    Some(LiveEvent::ToolCall(call)) => {
                        if call.name == ANALYSIS_TOOL {
                            let frame = AnalysisFrame::from_args(call.args);
                            store.dispatch(AppEvent::AddFrame(frame));
                        } else {
                            warn!(name = %call.name, "unexpected tool call");
                        }

                        // Acknowledge before touching the next event so the
                        // remote tool-call protocol cannot stall.
                        if let Err(e) = session
                            .lock()
                            .await
                            .send_tool_ok(&call.id, &call.name)
                            .await
                        {
                            warn!("tool acknowledgment failed: {e:#}");
                        }
                    }

                    Some(LiveEvent::Closed) | None => {
                        info!("live session closed by remote");
                        break ConnectionState::Disconnected;
                    }

                    Some(LiveEvent::Error(message)) => {
                        error!("live session error: {message}");
                        break ConnectionState::Error;
                    }
                }
            };

            if let Some(manager) = manager.upgrade() {
                manager.teardown(Some(generation), final_state, true).await;
            }
        })
    }

    /// Release everything the active session holds, in dependency order:
    /// frame timer, audio forwarder, capture devices, then the live session.
    /// Tolerates never-acquired resources and stale generations.
    async fn teardown(
        &self,
        expected_generation: Option<u64>,
        final_state: ConnectionState,
        from_event_loop: bool,
    ) {
        let taken = {
            let mut active = self.active.lock().await;
            match active.take() {
                Some(current) => {
                    if let Some(generation) = expected_generation {
                        if current.generation != generation {
                            // A newer session is live; leave it untouched.
                            *active = Some(current);
                            return;
                        }
                    }
                    Some(current)
                }
                None => None,
            }
        };

        let Some(current) = taken else {
            // Nothing acquired. A user disconnect still pins the indicator;
            // a remote teardown for a dead generation is a no-op.
            if expected_generation.is_none() {
                self.store
                    .dispatch(AppEvent::SetConnectionState(final_state));
            }
            return;
        };

        current.video_task.abort();
        current.audio_task.abort();
        if !from_event_loop {
            current.event_task.abort();
        }

        let mut backend = current.backend;
        if let Err(e) = backend.stop().await {
            warn!("media backend stop failed: {e:#}");
        }

        if let Err(e) = current.session.lock().await.close().await {
            warn!("live session close failed: {e:#}");
        }

        self.store
            .dispatch(AppEvent::SetConnectionState(final_state));
        info!(state = ?final_state, "session torn down");
    }
}
