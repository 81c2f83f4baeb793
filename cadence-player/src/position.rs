//! Cached-position poller
//!
//! Position queries must never block on the decoder, so while the player
//! is started a small poller snapshots the decoder's offset into an
//! atomic every refresh interval. The engine spawns one poller on every
//! entry to the started state and cancels it the moment the state leaves
//! it; reads elsewhere always see the last snapshot.

use crate::decoder::Decoder;
use crate::task::{Cancellation, StateCell};
use cadence_common::PlayerState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Poll `decoder` into `cached_ms` until cancelled
pub(crate) async fn run_position_cache(
    decoder: Arc<dyn Decoder>,
    state: Arc<StateCell>,
    cached_ms: Arc<AtomicU64>,
    refresh_interval: Duration,
    cancel: Cancellation,
) {
    debug!("position cache started");
    while !cancel.is_cancelled() {
        if state.get() == PlayerState::Started {
            cached_ms.store(decoder.position_ms(), Ordering::Release);
        }
        sleep(refresh_interval).await;
    }
    debug!("position cache stopped");
}
