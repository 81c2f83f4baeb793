//! Playback engine orchestration
//!
//! Coordinates the decoder sessions, buffering, gapless pre-roll, and
//! position caching for one playback queue position at a time.
//!
//! All mutating operations serialize on one engine lock. Decoder
//! callbacks arrive on an engine-owned channel and are dispatched by a
//! background task that takes the same lock, so state transitions and the
//! current/next swap are never concurrent with a caller. Background
//! controllers (buffering, pre-roll, position cache) run on their own
//! tasks and never hold the lock while sleeping.

use crate::buffering;
use crate::config::SharedConfig;
use crate::decoder::{DecoderEvent, DecoderFactory, SessionEvent};
use crate::error::{Error, Result};
use crate::position;
use crate::power::PowerHold;
use crate::preroll;
use crate::proxy::{ProxyHandle, ProxyServer};
use crate::session::{classify_completion, CompletionKind, DecoderSession};
use crate::task::{Cancellation, StateCell};
use crate::track::TrackHandle;
use cadence_common::{EventBus, PlayerEvent, PlayerState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

/// What to do when the primary decoder reports an asynchronous error
///
/// Armed per configure: once a track is playing, errors restart it from
/// the cached position; before that (and after a reset) they only reset
/// the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorPolicy {
    ResetOnly,
    RestartFromPosition,
}

/// Parameters of an in-flight asynchronous preparation
struct PendingPrepare {
    position_ms: u64,
    auto_start: bool,
}

/// Engine state guarded by the single engine lock
struct EngineInner {
    /// Current role state machine
    state: PlayerState,

    /// Next role state machine (independent, promotion-gated)
    next_state: PlayerState,

    /// Track occupying the current role
    current: Option<Arc<TrackHandle>>,

    /// Track queued for gapless handoff
    next: Option<Arc<TrackHandle>>,

    /// Primary decoder session (current role)
    primary: DecoderSession,

    /// Secondary decoder session (next role, or the retiring session
    /// right after a promotion)
    secondary: Option<DecoderSession>,

    /// Whether the primary's configured source is the partial file
    primary_partial: bool,

    primary_error_policy: ErrorPolicy,

    /// Completion handling is armed per configure and disarmed by reset;
    /// a decoder that signals end-of-stream while disarmed is ignored
    completion_armed: bool,

    pending_prepare: Option<PendingPrepare>,

    /// Whether the secondary is registered as the platform successor
    next_chained: bool,

    /// Set once 100% download progress has been mirrored; no further
    /// progress events for this source
    progress_muted: bool,

    buffer_cancel: Option<Cancellation>,
    preroll_cancel: Option<Cancellation>,
    position_cancel: Option<Cancellation>,

    /// Running loopback server while the primary reads a partial file
    proxy: Option<Box<dyn ProxyHandle>>,
}

/// Playback engine - orchestrates decoder sessions and controllers
pub struct PlayerEngine {
    config: SharedConfig,
    events: EventBus,
    factory: Arc<dyn DecoderFactory>,
    proxy_server: Arc<dyn ProxyServer>,
    power: Arc<dyn PowerHold>,

    inner: Arc<Mutex<EngineInner>>,

    /// Lock-free mirror of the current role's state for poll loops
    state_cell: Arc<StateCell>,

    /// Last known playback offset in milliseconds
    cached_position_ms: Arc<AtomicU64>,

    session_tx: mpsc::UnboundedSender<SessionEvent>,

    /// Taken by the dispatcher on start
    session_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>>,

    running: Arc<AtomicBool>,
}

impl PlayerEngine {
    /// Create the engine with its primary decoder session
    pub fn new(
        factory: Arc<dyn DecoderFactory>,
        proxy_server: Arc<dyn ProxyServer>,
        power: Arc<dyn PowerHold>,
        config: SharedConfig,
        events: EventBus,
    ) -> Result<Self> {
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let primary = DecoderSession::create(factory.as_ref(), &session_tx)?;
        info!("player engine created");

        Ok(Self {
            config,
            events,
            factory,
            proxy_server,
            power,
            inner: Arc::new(Mutex::new(EngineInner {
                state: PlayerState::Idle,
                next_state: PlayerState::Idle,
                current: None,
                next: None,
                primary,
                secondary: None,
                primary_partial: false,
                primary_error_policy: ErrorPolicy::ResetOnly,
                completion_armed: false,
                pending_prepare: None,
                next_chained: false,
                progress_muted: false,
                buffer_cancel: None,
                preroll_cancel: None,
                position_cancel: None,
                proxy: None,
            })),
            state_cell: Arc::new(StateCell::new(PlayerState::Idle)),
            cached_position_ms: Arc::new(AtomicU64::new(0)),
            session_tx,
            session_rx: Arc::new(Mutex::new(Some(session_rx))),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start the decoder-event dispatcher
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(mut rx) = self.session_rx.lock().await.take() else {
            return;
        };

        let engine = self.clone_handles();
        tokio::spawn(async move {
            debug!("decoder event dispatcher started");
            while let Some(event) = rx.recv().await {
                if !engine.running.load(Ordering::Acquire) {
                    break;
                }
                engine.dispatch(event).await;
            }
            debug!("decoder event dispatcher stopped");
        });
    }

    /// Tear the engine down: cancel controllers, release both sessions,
    /// stop the loopback server, release the power hold
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::Release);

        let mut inner = self.inner.lock().await;
        self.reset_locked(&mut inner);
        if let Some(cancel) = inner.preroll_cancel.take() {
            cancel.cancel();
        }
        inner.primary.release();
        if let Some(secondary) = inner.secondary.take() {
            secondary.release();
        }
        if let Some(proxy) = inner.proxy.take() {
            proxy.stop();
        }
        self.power.release();
        info!("player engine shut down");
    }

    // ------------------------------------------------------------------
    // Public playback operations
    // ------------------------------------------------------------------

    /// Make `track` the current item and buffer-then-play it from the top
    ///
    /// Supersedes any in-flight pre-roll for the previous queue shape.
    pub async fn play(&self, track: Arc<TrackHandle>) {
        let mut inner = self.inner.lock().await;
        if let Some(cancel) = inner.preroll_cancel.take() {
            cancel.cancel();
        }
        self.assign_current(&mut inner, Some(track));
        self.buffer_and_play_locked(&mut inner);
    }

    /// Start the current track: immediately when already prepared,
    /// otherwise through a fresh buffering pass from offset zero
    pub async fn buffer_and_play(&self) {
        let mut inner = self.inner.lock().await;
        self.buffer_and_play_locked(&mut inner);
    }

    /// Hold the primary decoder; pair with
    /// [`set_player_state`](Self::set_player_state)
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        if let Err(err) = inner.primary.decoder().pause() {
            self.handle_error(&mut inner, &err);
        }
    }

    /// Resume the primary decoder after a pause
    pub async fn resume(&self) {
        let mut inner = self.inner.lock().await;
        if let Err(err) = inner.primary.decoder().start() {
            self.handle_error(&mut inner, &err);
        }
    }

    /// Seek the primary decoder and refresh the cached position
    pub async fn seek_to(&self, position_ms: u64) {
        let mut inner = self.inner.lock().await;
        match inner.primary.decoder().seek_to(position_ms) {
            Ok(()) => self.cached_position_ms.store(position_ms, Ordering::Release),
            Err(err) => self.handle_error(&mut inner, &err),
        }
    }

    /// Swap the pre-rolled next session into the current role
    pub async fn promote_next(&self) {
        let mut inner = self.inner.lock().await;
        self.promote_locked(&mut inner);
    }

    /// Cancel pending buffering, drop the configured source, return to
    /// idle; the decoder instance survives for the next configure
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        self.reset_locked(&mut inner);
    }

    /// Transition the current role's state machine
    pub async fn set_player_state(&self, state: PlayerState) {
        let mut inner = self.inner.lock().await;
        self.set_state(&mut inner, state);
    }

    /// Replace the track occupying the current role without touching the
    /// decoder
    pub async fn set_current_playing(&self, track: Option<Arc<TrackHandle>>) {
        let mut inner = self.inner.lock().await;
        self.assign_current(&mut inner, track);
    }

    /// Queue `track` for gapless handoff and start its pre-roll watch
    ///
    /// Passing `None` clears the next role. A newer call supersedes any
    /// pre-roll watch already running.
    pub async fn set_next_playing(&self, track: Option<Arc<TrackHandle>>) {
        let mut inner = self.inner.lock().await;
        if let Some(cancel) = inner.preroll_cancel.take() {
            cancel.cancel();
        }

        let Some(track) = track else {
            inner.next = None;
            self.set_next_state(&mut inner, PlayerState::Idle);
            return;
        };

        inner.next = Some(Arc::clone(&track));
        self.set_next_state(&mut inner, PlayerState::Idle);

        let Some(current) = inner.current.clone() else {
            debug!("no current track; next stays queued without pre-roll");
            return;
        };

        let cfg = self.config.snapshot();
        let cancel = Cancellation::new();
        inner.preroll_cancel = Some(cancel.clone());

        let engine = self.clone_handles();
        tokio::spawn(async move {
            let ready = preroll::wait_for_preroll(
                current,
                Arc::clone(&engine.state_cell),
                Duration::from_millis(cfg.preroll_delay_ms),
                Duration::from_millis(cfg.preroll_poll_interval_ms),
                cancel.clone(),
            )
            .await;
            if ready {
                engine.preroll_ready(track, cancel).await;
            }
        });
    }

    /// Drop the queued next track and cancel its pre-roll watch
    pub async fn clear_next_playing(&self) {
        let mut inner = self.inner.lock().await;
        inner.next = None;
        inner.next_chained = false;
        if let Some(cancel) = inner.preroll_cancel.take() {
            cancel.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current role's state, without taking the engine lock
    pub fn state(&self) -> PlayerState {
        self.state_cell.get()
    }

    /// Next role's state
    pub async fn next_state(&self) -> PlayerState {
        self.inner.lock().await.next_state
    }

    /// Track occupying the current role
    pub async fn current_track(&self) -> Option<Arc<TrackHandle>> {
        self.inner.lock().await.current.clone()
    }

    /// Last cached playback offset; zero before the source is prepared.
    /// Never calls into the decoder.
    pub async fn position_ms(&self) -> u64 {
        let inner = self.inner.lock().await;
        if inner.state.is_prepared() {
            self.cached_position_ms.load(Ordering::Acquire)
        } else {
            0
        }
    }

    /// Track duration, preferring catalog metadata over the decoder
    pub async fn duration_ms(&self) -> u64 {
        let inner = self.inner.lock().await;
        if let Some(duration) = inner.current.as_ref().and_then(|t| t.duration_ms()) {
            return duration;
        }
        if inner.state.is_prepared() {
            inner.primary.decoder().duration_ms().unwrap_or(0)
        } else {
            0
        }
    }

    /// Rendering volume of the primary decoder
    pub async fn set_volume(&self, volume: f32) {
        self.inner.lock().await.primary.decoder().set_volume(volume);
    }

    /// Primary decoder's platform audio-session handle, for external
    /// effect attachment
    pub async fn audio_session_id(&self) -> u32 {
        self.inner.lock().await.primary.decoder().audio_session_id()
    }

    /// Subscribe to playback notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Decoder event dispatch
    // ------------------------------------------------------------------

    async fn dispatch(&self, event: SessionEvent) {
        let mut inner = self.inner.lock().await;
        if inner.primary.accepts(&event) {
            match event.event {
                DecoderEvent::Prepared => self.on_primary_prepared(&mut inner),
                DecoderEvent::Completed => self.on_primary_completion(&mut inner),
                DecoderEvent::Error { message } => self.on_primary_error(&mut inner, &message),
                DecoderEvent::BufferingProgress { percent } => {
                    self.on_buffering_progress(&mut inner, percent)
                }
            }
        } else if inner
            .secondary
            .as_ref()
            .map_or(false, |s| s.accepts(&event))
        {
            match event.event {
                DecoderEvent::Prepared => self.on_secondary_prepared(&mut inner),
                DecoderEvent::Error { message } => self.handle_error_next(&mut inner, &message),
                // The secondary never renders before promotion
                _ => {}
            }
        } else {
            debug!("dropping stale decoder event: {:?}", event);
        }
    }

    fn on_primary_prepared(&self, inner: &mut EngineInner) {
        info!("decoder prepared");
        self.set_state(inner, PlayerState::Prepared);

        let pending = match inner.pending_prepare.take() {
            Some(pending) => pending,
            None => return,
        };

        // Full secondary indicator when the whole file is already local
        if let Some(track) = &inner.current {
            if track.is_download_complete() {
                self.events.emit_lossy(PlayerEvent::BufferingProgress {
                    track_id: track.track().id,
                    percent: 100,
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        if pending.position_ms != 0 {
            info!("restarting player from position {}", pending.position_ms);
            if let Err(err) = inner.primary.decoder().seek_to(pending.position_ms) {
                self.handle_error(inner, &err);
                return;
            }
        }
        self.cached_position_ms
            .store(pending.position_ms, Ordering::Release);

        if pending.auto_start {
            match inner.primary.decoder().start() {
                Ok(()) => self.set_state(inner, PlayerState::Started),
                Err(err) => {
                    self.handle_error(inner, &err);
                    return;
                }
            }
        } else {
            self.set_state(inner, PlayerState::Paused);
        }

        self.events.emit_lossy(PlayerEvent::TrackPrepared {
            timestamp: chrono::Utc::now(),
        });
    }

    fn on_primary_completion(&self, inner: &mut EngineInner) {
        if !inner.completion_armed {
            debug!("ignoring completion from a disarmed session");
            return;
        }

        // The renderer drops its own hold once this callback returns;
        // keep the host awake through the handoff.
        self.power.acquire(Duration::from_secs(60));

        let Some(track) = inner.current.clone() else {
            return;
        };
        let position = self.cached_position_ms.load(Ordering::Acquire);
        let duration = track.duration_ms().unwrap_or(0);
        info!("ending position {} of {}", position, duration);

        match classify_completion(
            position,
            duration,
            inner.primary_partial,
            track.is_download_complete(),
        ) {
            CompletionKind::Genuine => {
                self.set_state(inner, PlayerState::Completed);

                let cfg = self.config.snapshot();
                if cfg.gapless_playback
                    && inner.next.is_some()
                    && inner.next_state == PlayerState::Prepared
                    && inner.secondary.is_some()
                {
                    inner.next_chained = false;
                    self.promote_locked(inner);
                } else {
                    self.events.emit_lossy(PlayerEvent::TrackCompleted {
                        track: Some(track.track().clone()),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            CompletionKind::SpuriousRestart => {
                info!("requesting restart from {} of {}", position, duration);
                self.reset_locked(inner);
                track.set_playing(false);
                self.do_play(inner, &track, position, true);
                track.set_playing(true);
            }
            CompletionKind::SpuriousRebuffer => {
                info!("requesting restart from {} of {}", position, duration);
                self.reset_locked(inner);
                self.start_buffering(inner, track, position);
            }
        }
    }

    fn on_primary_error(&self, inner: &mut EngineInner, message: &str) {
        match inner.primary_error_policy {
            ErrorPolicy::ResetOnly => {
                self.handle_error(inner, &Error::Decoder(message.to_string()));
            }
            ErrorPolicy::RestartFromPosition => {
                let Some(track) = inner.current.clone() else {
                    self.handle_error(inner, &Error::Decoder(message.to_string()));
                    return;
                };
                warn!("error on playing file: {} ({:?})", message, track);
                let position = self.cached_position_ms.load(Ordering::Acquire);
                self.reset_locked(inner);
                track.set_playing(false);
                self.do_play(inner, &track, position, true);
                track.set_playing(true);
            }
        }
    }

    fn on_buffering_progress(&self, inner: &mut EngineInner, percent: u8) {
        if inner.progress_muted {
            return;
        }
        let Some(track) = inner.current.clone() else {
            return;
        };

        if percent >= 100 {
            self.events.emit_lossy(PlayerEvent::BufferingProgress {
                track_id: track.track().id,
                percent: 100,
                timestamp: chrono::Utc::now(),
            });
            inner.progress_muted = true;
        } else {
            let cfg = self.config.snapshot();
            if inner.primary_partial
                && track.track().transcoded_content_type.is_none()
                && cfg.max_bit_rate_kbps == 0
            {
                self.events.emit_lossy(PlayerEvent::BufferingProgress {
                    track_id: track.track().id,
                    percent,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    fn on_secondary_prepared(&self, inner: &mut EngineInner) {
        self.set_next_state(inner, PlayerState::Prepared);

        let cfg = self.config.snapshot();
        if !(cfg.gapless_playback && inner.state.is_active()) {
            return;
        }
        let Some(next_decoder) = inner.secondary.as_ref().map(|s| Arc::clone(s.decoder()))
        else {
            return;
        };
        match inner.primary.decoder().set_next(next_decoder) {
            Ok(()) => inner.next_chained = true,
            Err(err) => self.handle_error_next(inner, &err.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Internals (engine lock held)
    // ------------------------------------------------------------------

    fn set_state(&self, inner: &mut EngineInner, state: PlayerState) {
        info!("{} -> {} ({:?})", inner.state, state, inner.current);
        inner.state = state;
        self.state_cell.set(state);

        self.events.emit_lossy(PlayerEvent::PlayerStateChanged {
            state,
            track: inner.current.as_ref().map(|t| t.track().clone()),
            timestamp: chrono::Utc::now(),
        });

        if state == PlayerState::Started {
            if inner.position_cancel.is_none() {
                let cancel = Cancellation::new();
                inner.position_cancel = Some(cancel.clone());
                let cfg = self.config.snapshot();
                tokio::spawn(position::run_position_cache(
                    Arc::clone(inner.primary.decoder()),
                    Arc::clone(&self.state_cell),
                    Arc::clone(&self.cached_position_ms),
                    Duration::from_millis(cfg.position_refresh_interval_ms),
                    cancel,
                ));
            }
        } else if let Some(cancel) = inner.position_cancel.take() {
            cancel.cancel();
        }
    }

    fn set_next_state(&self, inner: &mut EngineInner, state: PlayerState) {
        info!("next: {} -> {} ({:?})", inner.next_state, state, inner.next);
        inner.next_state = state;
    }

    fn assign_current(&self, inner: &mut EngineInner, track: Option<Arc<TrackHandle>>) {
        debug!("set current playing {:?}", track);
        inner.current = track;

        self.events.emit_lossy(PlayerEvent::CurrentTrackChanged {
            track: inner.current.as_ref().map(|t| t.track().clone()),
            timestamp: chrono::Utc::now(),
        });
    }

    fn buffer_and_play_locked(&self, inner: &mut EngineInner) {
        let Some(track) = inner.current.clone() else {
            warn!("buffer-and-play without a current track");
            return;
        };

        if inner.state != PlayerState::Prepared {
            self.reset_locked(inner);
            self.start_buffering(inner, track, 0);
        } else {
            self.do_play(inner, &track, 0, true);
        }
    }

    fn start_buffering(&self, inner: &mut EngineInner, track: Arc<TrackHandle>, position_ms: u64) {
        // A newer buffering pass supersedes any previous one
        if let Some(cancel) = inner.buffer_cancel.take() {
            cancel.cancel();
        }

        let cfg = self.config.snapshot();
        let target =
            buffering::expected_file_size(position_ms, track.bit_rate_kbps(), cfg.buffer_seconds);
        info!(
            "buffering from position {} and bitrate {}",
            position_ms,
            track.bit_rate_kbps()
        );

        let cancel = Cancellation::new();
        inner.buffer_cancel = Some(cancel.clone());
        self.set_state(inner, PlayerState::Downloading);

        let interval = Duration::from_millis(cfg.buffer_poll_interval_ms);
        let engine = self.clone_handles();
        tokio::spawn(async move {
            if buffering::wait_for_buffer(&track, target, interval, &cancel).await {
                engine.buffering_finished(track, position_ms, cancel).await;
            }
        });
    }

    async fn buffering_finished(
        &self,
        track: Arc<TrackHandle>,
        position_ms: u64,
        cancel: Cancellation,
    ) {
        let mut inner = self.inner.lock().await;
        // Superseded while waiting for the lock
        if cancel.is_cancelled() {
            return;
        }
        inner.buffer_cancel = None;
        self.do_play(&mut inner, &track, position_ms, true);
    }

    fn do_play(
        &self,
        inner: &mut EngineInner,
        track: &Arc<TrackHandle>,
        position_ms: u64,
        auto_start: bool,
    ) {
        if let Err(err) = self.try_configure(inner, track, position_ms, auto_start) {
            self.handle_error(inner, &err);
        }
    }

    fn try_configure(
        &self,
        inner: &mut EngineInner,
        track: &Arc<TrackHandle>,
        position_ms: u64,
        auto_start: bool,
    ) -> Result<()> {
        track.set_playing(false);
        let source = track.best_source();

        inner.progress_muted = false;
        inner.primary.reset();
        self.set_state(inner, PlayerState::Idle);

        let url = if source.partial {
            let url = match inner.proxy.as_ref() {
                Some(proxy) => proxy.url_for(&source.path),
                None => {
                    let proxy = self.proxy_server.start()?;
                    let url = proxy.url_for(&source.path);
                    inner.proxy = Some(proxy);
                    url
                }
            };
            info!("data source: {}", url);
            url
        } else {
            if let Some(proxy) = inner.proxy.take() {
                proxy.stop();
            }
            source.path.to_string_lossy().into_owned()
        };

        info!("preparing decoder");
        inner.primary.configure(&url)?;
        self.set_state(inner, PlayerState::Preparing);

        inner.primary_partial = source.partial;
        inner.primary_error_policy = ErrorPolicy::RestartFromPosition;
        inner.completion_armed = true;
        inner.pending_prepare = Some(PendingPrepare {
            position_ms,
            auto_start,
        });
        Ok(())
    }

    async fn preroll_ready(&self, track: Arc<TrackHandle>, cancel: Cancellation) {
        let mut inner = self.inner.lock().await;
        // Superseded while waiting for the lock
        if cancel.is_cancelled() {
            return;
        }
        inner.preroll_cancel = None;
        self.setup_next(&mut inner, &track);
    }

    fn setup_next(&self, inner: &mut EngineInner, track: &Arc<TrackHandle>) {
        if let Err(err) = self.try_setup_next(inner, track) {
            self.handle_error_next(inner, &err.to_string());
        }
    }

    fn try_setup_next(&self, inner: &mut EngineInner, track: &Arc<TrackHandle>) -> Result<()> {
        let source = track.best_source();

        if let Some(old) = inner.secondary.take() {
            old.release();
        }

        let session = DecoderSession::create(self.factory.as_ref(), &self.session_tx)?;
        // Shared routing lets the successor render through the same
        // platform session; unavailable on some backends.
        let primary_session = inner.primary.decoder().audio_session_id();
        if let Err(err) = session.decoder().share_audio_session(primary_session) {
            debug!("audio session sharing unavailable: {}", err);
        }

        session.configure(&source.path.to_string_lossy())?;
        inner.secondary = Some(session);
        self.set_next_state(inner, PlayerState::Preparing);
        Ok(())
    }

    fn promote_locked(&self, inner: &mut EngineInner) {
        let Some(secondary) = inner.secondary.take() else {
            warn!("promote requested without a prepared next session");
            return;
        };

        // Slot swap: the retiring session parks in the next slot until
        // the following pre-roll replaces it.
        let retired = std::mem::replace(&mut inner.primary, secondary);
        inner.secondary = Some(retired);

        let next_track = inner.next.clone();
        self.assign_current(inner, next_track);
        self.set_next_state(inner, PlayerState::Idle);

        inner.primary_partial = false;
        inner.primary_error_policy = ErrorPolicy::RestartFromPosition;
        inner.completion_armed = true;
        inner.pending_prepare = None;
        inner.progress_muted = true;
        self.cached_position_ms.store(0, Ordering::Release);

        // When the platform chain was registered the successor is already
        // rendering; otherwise start it here.
        let chained = std::mem::take(&mut inner.next_chained);
        if !chained {
            if let Err(err) = inner.primary.decoder().start() {
                self.handle_error(inner, &err);
                return;
            }
        }
        self.set_state(inner, PlayerState::Started);

        self.events.emit_lossy(PlayerEvent::NextTrackRequested {
            timestamp: chrono::Utc::now(),
        });

        // The promoted session was fed from a complete file; the loopback
        // server is no longer needed.
        if let Some(proxy) = inner.proxy.take() {
            proxy.stop();
        }
    }

    fn reset_locked(&self, inner: &mut EngineInner) {
        if let Some(cancel) = inner.buffer_cancel.take() {
            cancel.cancel();
        }
        self.set_state(inner, PlayerState::Idle);
        inner.primary_error_policy = ErrorPolicy::ResetOnly;
        inner.completion_armed = false;
        inner.pending_prepare = None;
        inner.primary.reset();
    }

    fn handle_error(&self, inner: &mut EngineInner, err: &Error) {
        warn!("decoder error: {}", err);
        inner.primary.reset();
        inner.primary_error_policy = ErrorPolicy::ResetOnly;
        inner.completion_armed = false;
        inner.pending_prepare = None;
        self.set_state(inner, PlayerState::Idle);
    }

    fn handle_error_next(&self, inner: &mut EngineInner, message: &str) {
        warn!("next decoder error: {}", message);
        if let Some(secondary) = &inner.secondary {
            secondary.reset();
        }
        self.set_next_state(inner, PlayerState::Idle);
    }

    /// Clone handles for spawned tasks
    fn clone_handles(&self) -> Self {
        Self {
            config: self.config.clone(),
            events: self.events.clone(),
            factory: Arc::clone(&self.factory),
            proxy_server: Arc::clone(&self.proxy_server),
            power: Arc::clone(&self.power),
            inner: Arc::clone(&self.inner),
            state_cell: Arc::clone(&self.state_cell),
            cached_position_ms: Arc::clone(&self.cached_position_ms),
            session_tx: self.session_tx.clone(),
            session_rx: Arc::clone(&self.session_rx),
            running: Arc::clone(&self.running),
        }
    }
}
