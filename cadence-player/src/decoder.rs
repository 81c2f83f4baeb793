//! Decoder/renderer capability boundary
//!
//! The engine never decodes audio itself; a platform decode/render engine
//! is injected behind [`Decoder`]. Synchronous control calls return
//! `Result` and feed the engine's recovery paths; asynchronous outcomes
//! (prepared, completion, errors, download progress) arrive as
//! [`DecoderEvent`]s on an engine-owned channel, stamped with the
//! emitting session's identity so stale callbacks from a superseded
//! source are dropped at dispatch.

use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Asynchronous outcome reported by a decoder
#[derive(Debug, Clone)]
pub enum DecoderEvent {
    /// Asynchronous preparation finished; the source is seekable and
    /// startable
    Prepared,

    /// The renderer reached end of stream
    ///
    /// For a partial source this may be the current end of a still-growing
    /// file rather than the track's true end; the engine classifies it.
    Completed,

    /// Decode/render failure
    Error { message: String },

    /// Percent of the source the decoder has buffered locally
    BufferingProgress { percent: u8 },
}

/// A [`DecoderEvent`] stamped with the emitting session's identity
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Id of the session whose decoder emitted this
    pub session_id: u64,

    /// Callback generation the event belongs to
    pub epoch: u64,

    pub event: DecoderEvent,
}

/// Event channel handed to a decoder at creation
///
/// Stamps each event with the owning session's id and its callback
/// generation at emit time. The generation is bumped whenever the session
/// is reset or reconfigured, so events from a superseded source are
/// rejected by the dispatcher even if they were already in flight.
#[derive(Clone)]
pub struct EventSink {
    session_id: u64,
    epoch: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(
        session_id: u64,
        epoch: Arc<AtomicU64>,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            session_id,
            epoch,
            tx,
        }
    }

    /// Emit an event; silently dropped once the engine has shut down
    pub fn emit(&self, event: DecoderEvent) {
        let _ = self.tx.send(SessionEvent {
            session_id: self.session_id,
            epoch: self.epoch.load(Ordering::Acquire),
            event,
        });
    }
}

/// Platform decode/render engine capability
///
/// One instance renders one source at a time. Control calls are cheap and
/// non-blocking; `prepare_async` returns immediately and the outcome
/// arrives later on the [`EventSink`].
///
/// Contract for implementors: after `reset` or `release` returns, the
/// instance must emit no further events for the previous source. Events
/// already emitted may still be in flight; the engine discards those by
/// generation stamp.
pub trait Decoder: Send + Sync {
    /// Select the source to decode (local path or loopback URL)
    fn set_source(&self, url: &str) -> Result<()>;

    /// Begin asynchronous preparation of the configured source
    fn prepare_async(&self) -> Result<()>;

    /// Start or resume rendering
    fn start(&self) -> Result<()>;

    /// Hold rendering without losing the prepared source
    fn pause(&self) -> Result<()>;

    /// Seek the prepared source
    fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Instantaneous playback offset; safe to call concurrently with
    /// control calls
    fn position_ms(&self) -> u64;

    /// Source duration once known, `None` before preparation completes
    fn duration_ms(&self) -> Option<u64>;

    /// Rendering volume, 0.0–1.0
    fn set_volume(&self, volume: f32);

    /// Platform audio-session handle, for external effect attachment
    fn audio_session_id(&self) -> u32;

    /// Join another instance's audio session so a successor renders
    /// through the same routing; platforms without session sharing return
    /// an error and the caller falls back silently
    fn share_audio_session(&self, session_id: u32) -> Result<()>;

    /// Register `next` as the platform-level successor for glitch-free
    /// handoff at end of stream
    fn set_next(&self, next: Arc<dyn Decoder>) -> Result<()>;

    /// Unregister any platform-level successor
    fn clear_next(&self);

    /// Drop the configured source and return to the unconfigured state
    fn reset(&self);

    /// Release the underlying engine instance; the decoder must not be
    /// used afterwards
    fn release(&self);
}

/// Creates decoder instances
///
/// Called once at engine initialization for the primary session and again
/// for every pre-roll of a next track.
pub trait DecoderFactory: Send + Sync {
    fn create(&self, events: EventSink) -> Result<Arc<dyn Decoder>>;
}
