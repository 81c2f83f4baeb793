//! Event types and EventBus for the Cadence playback engine
//!
//! Playback notifications are fire-and-forget: the engine emits onto the
//! bus and never blocks on consumers. The UI and remote-control layers
//! subscribe and drain events on their own delivery context, which keeps
//! the engine free of any UI-thread marshaling policy.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::state::PlayerState;
use crate::types::Track;

/// Playback notifications published by the engine
///
/// Events are broadcast via [`EventBus`] and can be serialized for an
/// out-of-process control surface. Ordering between distinct event types
/// is not guaranteed beyond FIFO per subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Player state transition on the current role
    PlayerStateChanged {
        state: PlayerState,
        /// Track occupying the current role at transition time
        track: Option<Track>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current role now holds a different track
    CurrentTrackChanged {
        track: Option<Track>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Asynchronous preparation of the current track finished
    TrackPrepared {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pre-rolled track was promoted; the queue should supply a new next
    NextTrackRequested {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track finished and no gapless successor took over
    TrackCompleted {
        track: Option<Track>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Download progress of the current partial source, for the seek bar's
    /// secondary indicator
    BufferingProgress {
        track_id: Uuid,
        percent: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Wraps `tokio::broadcast`, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if nobody is listening.
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case
    ///
    /// Playback notifications are advisory; the engine uses this for every
    /// emission so that running headless is not an error.
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Channel capacity this bus was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
