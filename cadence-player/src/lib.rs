//! # Cadence playback engine (cadence-player)
//!
//! Local playback engine for a networked music-streaming client: drives
//! gapless playback of progressively downloaded tracks, handling partial
//! files, buffering thresholds, mid-stream decoder faults, and seamless
//! handoff to a pre-rolled next track.
//!
//! **Architecture:** one [`engine::PlayerEngine`] owns up to two decoder
//! sessions (current + next) behind the injected [`decoder::Decoder`]
//! capability, plus three cancellable background controllers: a buffering
//! poll against the growing partial file, a gapless pre-roll watch, and a
//! cached-position refresher. Playback notifications are published on the
//! shared `EventBus`.

pub mod buffering;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod position;
pub mod power;
pub mod preroll;
pub mod proxy;
pub mod session;
pub mod task;
pub mod track;

pub use config::{PlayerConfig, SharedConfig};
pub use engine::PlayerEngine;
pub use error::{Error, Result};
pub use track::{DownloadMonitor, LocalSource, TrackHandle};
