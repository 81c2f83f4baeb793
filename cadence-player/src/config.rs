//! Configuration for the playback engine
//!
//! Settings come in two tiers: a TOML file loaded once at startup
//! ([`PlayerConfig::load`]) and a runtime-shared wrapper
//! ([`SharedConfig`]) that the UI layer can mutate while playback is
//! running. Controllers read the shared wrapper at the moment they need a
//! value rather than caching it, so a preference change takes effect on
//! the next buffering attempt or pre-roll cycle.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Playback engine settings
///
/// All fields have built-in defaults; a missing TOML key falls back to the
/// code default.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    /// Seconds of audio to buffer before starting playback of a partial
    /// file. `0` means wait for the full download.
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: u64,

    /// Pre-roll the next track and hand off without an audible gap
    #[serde(default = "default_gapless_playback")]
    pub gapless_playback: bool,

    /// Server-side bitrate ceiling in kbit/s, `0` = unlimited
    ///
    /// When a ceiling is active the on-disk file size no longer matches
    /// the catalog bitrate, so download progress is not mirrored to the
    /// UI's secondary indicator.
    #[serde(default)]
    pub max_bit_rate_kbps: u32,

    /// Partial-file poll interval while buffering (milliseconds)
    #[serde(default = "default_buffer_poll_interval_ms")]
    pub buffer_poll_interval_ms: u64,

    /// Delay before the pre-roll controller starts polling (milliseconds),
    /// so it cannot compete with the primary preparation
    #[serde(default = "default_preroll_delay_ms")]
    pub preroll_delay_ms: u64,

    /// Pre-roll readiness poll interval (milliseconds)
    #[serde(default = "default_preroll_poll_interval_ms")]
    pub preroll_poll_interval_ms: u64,

    /// Cached-position refresh interval while started (milliseconds)
    #[serde(default = "default_position_refresh_interval_ms")]
    pub position_refresh_interval_ms: u64,
}

fn default_buffer_seconds() -> u64 {
    5
}

fn default_gapless_playback() -> bool {
    true
}

fn default_buffer_poll_interval_ms() -> u64 {
    1000
}

fn default_preroll_delay_ms() -> u64 {
    5000
}

fn default_preroll_poll_interval_ms() -> u64 {
    5000
}

fn default_position_refresh_interval_ms() -> u64 {
    50
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: default_buffer_seconds(),
            gapless_playback: default_gapless_playback(),
            max_bit_rate_kbps: 0,
            buffer_poll_interval_ms: default_buffer_poll_interval_ms(),
            preroll_delay_ms: default_preroll_delay_ms(),
            preroll_poll_interval_ms: default_preroll_poll_interval_ms(),
            position_refresh_interval_ms: default_position_refresh_interval_ms(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Runtime-shared configuration handle
///
/// Cheap to clone; reads take a snapshot so callers never hold the lock
/// across an await point.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<PlayerConfig>>,
}

impl SharedConfig {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current settings
    pub fn snapshot(&self) -> PlayerConfig {
        self.inner.read().expect("config lock poisoned").clone()
    }

    pub fn set_buffer_seconds(&self, seconds: u64) {
        self.inner.write().expect("config lock poisoned").buffer_seconds = seconds;
    }

    pub fn set_gapless_playback(&self, enabled: bool) {
        self.inner.write().expect("config lock poisoned").gapless_playback = enabled;
    }

    pub fn set_max_bit_rate_kbps(&self, kbps: u32) {
        self.inner.write().expect("config lock poisoned").max_bit_rate_kbps = kbps;
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}
