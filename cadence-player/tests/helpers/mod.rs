//! Shared fixtures for playback engine integration tests
//!
//! Provides a scriptable decoder backend, a simulated progressive
//! download, and small waiting utilities. The mock decoder emits its
//! asynchronous outcomes through the real event plumbing so tests
//! exercise the same dispatch paths as a platform backend.

#![allow(dead_code)]

use cadence_common::{EventBus, PlayerEvent, PlayerState, Track};
use cadence_player::config::{PlayerConfig, SharedConfig};
use cadence_player::decoder::{Decoder, DecoderEvent, DecoderFactory, EventSink};
use cadence_player::engine::PlayerEngine;
use cadence_player::error::{Error, Result};
use cadence_player::power::NoopPowerHold;
use cadence_player::proxy::{ProxyHandle, ProxyServer};
use cadence_player::track::{DownloadMonitor, LocalSource, TrackHandle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};

/// Scriptable decoder backend
///
/// Records every control call and emits Prepared/Error asynchronously a
/// few milliseconds after `prepare_async`, like a real platform engine.
pub struct MockDecoder {
    sink: EventSink,
    prepare_delay: Duration,

    pub sources: Mutex<Vec<String>>,
    pub seeks: Mutex<Vec<u64>>,
    position: AtomicU64,
    duration: AtomicU64,

    pub fail_set_source: AtomicBool,
    pub fail_prepare: AtomicBool,
    /// Make start/pause/seek control calls fail
    pub fail_controls: AtomicBool,

    pub started: AtomicBool,
    pub pause_count: AtomicU64,
    pub reset_count: AtomicU64,
    pub released: AtomicBool,

    /// True once a successor was chained onto this instance
    pub chained_next: AtomicBool,
    /// Audio session id this instance was asked to share, if any
    pub shared_session: Mutex<Option<u32>>,
    pub volume_percent: AtomicU64,
}

impl MockDecoder {
    fn new(sink: EventSink, prepare_delay: Duration) -> Self {
        Self {
            sink,
            prepare_delay,
            sources: Mutex::new(Vec::new()),
            seeks: Mutex::new(Vec::new()),
            position: AtomicU64::new(0),
            duration: AtomicU64::new(0),
            fail_set_source: AtomicBool::new(false),
            fail_prepare: AtomicBool::new(false),
            fail_controls: AtomicBool::new(false),
            started: AtomicBool::new(false),
            pause_count: AtomicU64::new(0),
            reset_count: AtomicU64::new(0),
            released: AtomicBool::new(false),
            chained_next: AtomicBool::new(false),
            shared_session: Mutex::new(None),
            volume_percent: AtomicU64::new(100),
        }
    }

    /// Simulate playback progress; the engine's position cache will pick
    /// this up on its next refresh
    pub fn set_position(&self, position_ms: u64) {
        self.position.store(position_ms, Ordering::Release);
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.duration.store(duration_ms, Ordering::Release);
    }

    /// Signal end of stream for the currently configured source
    pub fn emit_completed(&self) {
        self.sink.emit(DecoderEvent::Completed);
    }

    /// Signal an asynchronous decode/render failure
    pub fn emit_error(&self, message: &str) {
        self.sink.emit(DecoderEvent::Error {
            message: message.to_string(),
        });
    }

    /// Report local buffering progress for the configured source
    pub fn emit_progress(&self, percent: u8) {
        self.sink.emit(DecoderEvent::BufferingProgress { percent });
    }

    pub fn source_count(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    pub fn last_source(&self) -> Option<String> {
        self.sources.lock().unwrap().last().cloned()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl Decoder for MockDecoder {
    fn set_source(&self, url: &str) -> Result<()> {
        if self.fail_set_source.load(Ordering::Acquire) {
            return Err(Error::Decoder("rejected source".into()));
        }
        self.sources.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn prepare_async(&self) -> Result<()> {
        let sink = self.sink.clone();
        let delay = self.prepare_delay;
        let fail = self.fail_prepare.load(Ordering::Acquire);
        tokio::spawn(async move {
            sleep(delay).await;
            if fail {
                sink.emit(DecoderEvent::Error {
                    message: "prepare failed".into(),
                });
            } else {
                sink.emit(DecoderEvent::Prepared);
            }
        });
        Ok(())
    }

    fn start(&self) -> Result<()> {
        if self.fail_controls.load(Ordering::Acquire) {
            return Err(Error::Decoder("start failed".into()));
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        if self.fail_controls.load(Ordering::Acquire) {
            return Err(Error::Decoder("pause failed".into()));
        }
        self.started.store(false, Ordering::Release);
        self.pause_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn seek_to(&self, position_ms: u64) -> Result<()> {
        if self.fail_controls.load(Ordering::Acquire) {
            return Err(Error::Decoder("seek failed".into()));
        }
        self.seeks.lock().unwrap().push(position_ms);
        self.position.store(position_ms, Ordering::Release);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    fn duration_ms(&self) -> Option<u64> {
        match self.duration.load(Ordering::Acquire) {
            0 => None,
            duration => Some(duration),
        }
    }

    fn set_volume(&self, volume: f32) {
        self.volume_percent
            .store((volume * 100.0) as u64, Ordering::Release);
    }

    fn audio_session_id(&self) -> u32 {
        17
    }

    fn share_audio_session(&self, session_id: u32) -> Result<()> {
        *self.shared_session.lock().unwrap() = Some(session_id);
        Ok(())
    }

    fn set_next(&self, _next: Arc<dyn Decoder>) -> Result<()> {
        self.chained_next.store(true, Ordering::Release);
        Ok(())
    }

    fn clear_next(&self) {
        self.chained_next.store(false, Ordering::Release);
    }

    fn reset(&self) {
        self.reset_count.fetch_add(1, Ordering::AcqRel);
        self.started.store(false, Ordering::Release);
        self.position.store(0, Ordering::Release);
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}

/// Factory that records every decoder it hands out
pub struct MockFactory {
    pub created: Mutex<Vec<Arc<MockDecoder>>>,
    pub prepare_delay: Duration,
    pub fail_create: AtomicBool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            prepare_delay: Duration::from_millis(5),
            fail_create: AtomicBool::new(false),
        })
    }

    pub fn decoder(&self, index: usize) -> Arc<MockDecoder> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }

    pub fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl DecoderFactory for MockFactory {
    fn create(&self, events: EventSink) -> Result<Arc<dyn Decoder>> {
        if self.fail_create.load(Ordering::Acquire) {
            return Err(Error::Decoder("no decoder available".into()));
        }
        let decoder = Arc::new(MockDecoder::new(events, self.prepare_delay));
        self.created.lock().unwrap().push(Arc::clone(&decoder));
        Ok(decoder)
    }
}

/// Progressive download whose growth the test scripts
pub struct SimulatedDownload {
    partial_path: PathBuf,
    complete_path: PathBuf,
    bytes: AtomicU64,
    complete: AtomicBool,
}

impl SimulatedDownload {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            partial_path: PathBuf::from(format!("/tmp/cadence-test/{}.partial", name)),
            complete_path: PathBuf::from(format!("/tmp/cadence-test/{}.complete", name)),
            bytes: AtomicU64::new(0),
            complete: AtomicBool::new(false),
        })
    }

    pub fn set_bytes(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Release);
    }

    /// Mark the download finished
    pub fn finish(&self) {
        self.complete.store(true, Ordering::Release);
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    pub fn complete_path(&self) -> &Path {
        &self.complete_path
    }
}

impl DownloadMonitor for SimulatedDownload {
    fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn best_source(&self) -> LocalSource {
        if self.is_complete() {
            LocalSource {
                path: self.complete_path.clone(),
                partial: false,
            }
        } else {
            LocalSource {
                path: self.partial_path.clone(),
                partial: true,
            }
        }
    }
}

/// Loopback server stand-in that counts starts and stops
pub struct CountingProxy {
    pub starts: AtomicU64,
    pub stops: Arc<AtomicU64>,
}

struct CountingHandle {
    stops: Arc<AtomicU64>,
}

impl CountingProxy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicU64::new(0),
            stops: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::Acquire)
    }

    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::Acquire)
    }
}

impl ProxyServer for CountingProxy {
    fn start(&self) -> Result<Box<dyn ProxyHandle>> {
        self.starts.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(CountingHandle {
            stops: Arc::clone(&self.stops),
        }))
    }
}

impl ProxyHandle for CountingHandle {
    fn url_for(&self, path: &Path) -> String {
        format!("http://127.0.0.1:9999/{}", path.display())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::AcqRel);
    }
}

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Production semantics at test-speed intervals
pub fn test_config() -> SharedConfig {
    SharedConfig::new(PlayerConfig {
        buffer_seconds: 10,
        gapless_playback: true,
        max_bit_rate_kbps: 0,
        buffer_poll_interval_ms: 10,
        preroll_delay_ms: 20,
        preroll_poll_interval_ms: 10,
        position_refresh_interval_ms: 5,
    })
}

/// A fully wired engine over mock collaborators
pub struct TestRig {
    pub engine: Arc<PlayerEngine>,
    pub factory: Arc<MockFactory>,
    pub proxy: Arc<CountingProxy>,
    pub bus: EventBus,
}

impl TestRig {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: SharedConfig) -> Self {
        init_logging();
        let factory = MockFactory::new();
        let proxy = CountingProxy::new();
        let bus = EventBus::new(256);

        let factory_handle: Arc<dyn DecoderFactory> = factory.clone();
        let proxy_handle: Arc<dyn ProxyServer> = proxy.clone();
        let engine = Arc::new(
            PlayerEngine::new(
                factory_handle,
                proxy_handle,
                Arc::new(NoopPowerHold),
                config,
                bus.clone(),
            )
            .unwrap(),
        );
        engine.start().await;

        Self {
            engine,
            factory,
            proxy,
            bus,
        }
    }

    /// The decoder behind the primary session at engine creation
    pub fn primary(&self) -> Arc<MockDecoder> {
        self.factory.decoder(0)
    }
}

/// Catalog entry + simulated download for one track
pub fn make_track(
    name: &str,
    bit_rate_kbps: u32,
    duration_ms: Option<u64>,
) -> (Arc<SimulatedDownload>, Arc<TrackHandle>) {
    let download = SimulatedDownload::new(name);
    let mut track = Track::new(bit_rate_kbps, duration_ms);
    track.title = Some(name.to_string());
    let monitor: Arc<dyn DownloadMonitor> = download.clone();
    let handle = Arc::new(TrackHandle::new(track, monitor));
    (download, handle)
}

/// Poll a condition every few milliseconds, panicking after two seconds
pub async fn wait_until<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", description);
        }
        sleep(Duration::from_millis(5)).await;
    }
}

pub async fn wait_for_state(engine: &PlayerEngine, state: PlayerState) {
    wait_until(&format!("player state {}", state), || engine.state() == state).await;
}

pub async fn wait_for_next_state(engine: &Arc<PlayerEngine>, state: PlayerState) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while engine.next_state().await != state {
        if Instant::now() > deadline {
            panic!("timed out waiting for next state {}", state);
        }
        sleep(Duration::from_millis(5)).await;
    }
}

/// Receive events until one matches, panicking after two seconds
pub async fn expect_event<F>(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    description: &str,
    matcher: F,
) -> PlayerEvent
where
    F: Fn(&PlayerEvent) -> bool,
{
    let deadline = Duration::from_secs(2);
    loop {
        match timeout(deadline, rx.recv()).await {
            Ok(Ok(event)) => {
                if matcher(&event) {
                    return event;
                }
            }
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                panic!("event bus closed while waiting for {}", description)
            }
            Err(_) => panic!("timed out waiting for {}", description),
        }
    }
}
