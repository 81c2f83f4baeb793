//! Decoder session wrapper
//!
//! A [`DecoderSession`] binds one decoder instance to one role (current
//! or next) for the lifetime of one track. Sessions are never reused
//! across tracks: a track change or error resets/releases the session and
//! either reconfigures it from scratch or replaces it.
//!
//! The session also owns the callback-generation counter: every reset or
//! reconfigure bumps it, which invalidates any callbacks still in flight
//! from the previous source.

use crate::decoder::{Decoder, DecoderFactory, EventSink, SessionEvent};
use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One decoder instance bound to one role
pub struct DecoderSession {
    id: u64,
    decoder: Arc<dyn Decoder>,
    epoch: Arc<AtomicU64>,
}

impl DecoderSession {
    /// Create a session with a fresh decoder instance from `factory`
    pub fn create(
        factory: &dyn DecoderFactory,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let epoch = Arc::new(AtomicU64::new(0));
        let sink = EventSink::new(id, Arc::clone(&epoch), events.clone());
        let decoder = factory.create(sink)?;
        Ok(Self { id, decoder, epoch })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn decoder(&self) -> &Arc<dyn Decoder> {
        &self.decoder
    }

    /// True when `event` belongs to this session's live callback
    /// generation
    pub fn accepts(&self, event: &SessionEvent) -> bool {
        event.session_id == self.id && event.epoch == self.epoch.load(Ordering::Acquire)
    }

    /// Invalidate all callbacks from the current source
    ///
    /// Events already sitting in the dispatch channel carry the old
    /// generation and are dropped.
    pub fn detach(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Detach callbacks and reset the underlying decoder
    pub fn reset(&self) {
        self.detach();
        self.decoder.reset();
    }

    /// Point the decoder at a new source and begin asynchronous
    /// preparation
    ///
    /// The prepared/error outcome for this source arrives with the new
    /// callback generation.
    pub fn configure(&self, url: &str) -> Result<()> {
        self.detach();
        self.decoder.set_source(url)?;
        self.decoder.prepare_async()?;
        Ok(())
    }

    /// Detach callbacks and release the underlying decoder instance
    pub fn release(&self) {
        self.detach();
        self.decoder.release();
    }
}

/// How a completion signal should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// True end of track
    Genuine,

    /// Decoder gave up early but the file on disk is now complete:
    /// reconfigure and restart from the cached position
    SpuriousRestart,

    /// Decoder hit the current end of a still-growing file: go back to
    /// buffering from the cached position
    SpuriousRebuffer,
}

/// Classify an end-of-stream signal
///
/// A completion is genuine when the decoder was reading the complete
/// file, or when the download has since finished and the stop position is
/// within a second of the expected duration. Anything else means the
/// decoder ran off the current end of a growing file.
pub fn classify_completion(
    elapsed_ms: u64,
    duration_ms: u64,
    partial_source: bool,
    download_complete: bool,
) -> CompletionKind {
    if !partial_source || (download_complete && duration_ms.abs_diff(elapsed_ms) < 1000) {
        CompletionKind::Genuine
    } else if download_complete {
        CompletionKind::SpuriousRestart
    } else {
        CompletionKind::SpuriousRebuffer
    }
}
