//! Buffering controller
//!
//! Before playback of a partial file starts (or resumes after a spurious
//! completion), the engine waits for the file to grow past a byte target
//! derived from the track's bitrate and the configured buffer duration.
//! The wait is a cancellable sleep-and-check loop on its own task; a
//! newer play request supersedes it by cancelling the flag.

use crate::task::Cancellation;
use crate::track::TrackHandle;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Floor for the buffer target regardless of bitrate
pub const MIN_BUFFER_BYTES: u64 = 100_000;

/// Buffer duration used when the preference is 0 ("wait for the full
/// download"): a day of audio, effectively unlimited
pub const UNLIMITED_BUFFER_SECONDS: u64 = 86_400;

/// File size the partial file must reach before playback starts
///
/// `start_position_ms` accounts for resumes: the bytes already behind the
/// resume point plus at least `buffer_seconds` of audio ahead of it (never
/// less than [`MIN_BUFFER_BYTES`]).
pub fn expected_file_size(start_position_ms: u64, bit_rate_kbps: u32, buffer_seconds: u64) -> u64 {
    let buffer_seconds = if buffer_seconds == 0 {
        UNLIMITED_BUFFER_SECONDS
    } else {
        buffer_seconds
    };

    let bit_rate = bit_rate_kbps as u64;
    let byte_count = (bit_rate * 1024 / 8 * buffer_seconds).max(MIN_BUFFER_BYTES);
    let start_bytes = start_position_ms * bit_rate / 8;

    start_bytes + byte_count
}

/// True once the partial file satisfies the buffer target
fn buffer_complete(track: &TrackHandle, expected_file_size: u64) -> bool {
    let complete = track.is_download_complete();
    let size = track.bytes_written();
    debug!(
        "buffering {:?} ({}/{}, {})",
        track, size, expected_file_size, complete
    );
    complete || size >= expected_file_size
}

/// Poll the partial file until the target is met or the wait is cancelled
///
/// Returns `true` when playback should start; `false` when superseded.
/// The cancellation flag is checked after every sleep so a superseded
/// controller exits without side effects. Callers must re-check the flag
/// under the engine lock before acting on a `true` result.
pub(crate) async fn wait_for_buffer(
    track: &TrackHandle,
    expected_file_size: u64,
    poll_interval: Duration,
    cancel: &Cancellation,
) -> bool {
    while !buffer_complete(track, expected_file_size) {
        sleep(poll_interval).await;
        if cancel.is_cancelled() {
            return false;
        }
    }
    !cancel.is_cancelled()
}
