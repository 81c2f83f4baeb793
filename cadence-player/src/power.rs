//! Wake-lock-equivalent resource boundary
//!
//! Some platforms let the device sleep the moment the decoder finishes a
//! track, which would kill the gapless handoff. The engine takes a short
//! hold around completion processing and releases everything at teardown.
//! Acquisition is best-effort; failures degrade playback but never stop
//! it.

use std::time::Duration;

/// Keeps the host awake while playback work is pending
pub trait PowerHold: Send + Sync {
    /// Acquire a hold that auto-expires after `timeout`; idempotent
    fn acquire(&self, timeout: Duration);

    /// Release any outstanding hold; idempotent
    fn release(&self);
}

/// No-op hold for platforms without a sleep policy (and for tests)
pub struct NoopPowerHold;

impl PowerHold for NoopPowerHold {
    fn acquire(&self, _timeout: Duration) {}

    fn release(&self) {}
}
