//! Gapless pre-roll controller
//!
//! Once the current track's own download has finished and playback is
//! stable, a second decoder session is prepared for the next track so the
//! handoff at end of stream is inaudible. Pre-roll is strictly an
//! optimization: it waits its turn, it never competes with the primary
//! preparation or a still-downloading current file, and any failure falls
//! back to the ordinary completion path.

use crate::task::{Cancellation, StateCell};
use crate::track::TrackHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// True once the secondary session may be prepared
fn ready_to_preroll(current: &TrackHandle, state: &StateCell) -> bool {
    let complete = current.is_download_complete();
    debug!(
        "pre-roll check: current {:?} complete={} state={}",
        current,
        complete,
        state.get()
    );
    complete && state.get().is_active()
}

/// Wait until the next track may be pre-rolled
///
/// Sleeps `initial_delay` first so this preparation cannot race the
/// primary one, then polls. Returns `true` when the secondary session
/// should be set up; `false` when cancelled. Callers must re-check the
/// cancellation flag under the engine lock before configuring anything.
pub(crate) async fn wait_for_preroll(
    current: Arc<TrackHandle>,
    state: Arc<StateCell>,
    initial_delay: Duration,
    poll_interval: Duration,
    cancel: Cancellation,
) -> bool {
    sleep(initial_delay).await;
    if cancel.is_cancelled() {
        return false;
    }

    while !ready_to_preroll(&current, &state) {
        sleep(poll_interval).await;
        if cancel.is_cancelled() {
            return false;
        }
    }
    true
}
