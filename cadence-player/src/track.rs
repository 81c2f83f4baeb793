//! Track handles and the progressive-download observation boundary
//!
//! The download subsystem owns the files on disk and their growth; the
//! engine only observes them through [`DownloadMonitor`]. A
//! [`TrackHandle`] bundles a track's catalog metadata with its monitor
//! and is shared by `Arc` between the queue, the engine, and its
//! background controllers.

use cadence_common::Track;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Best locally available source for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    /// Path of the complete or partial file
    pub path: PathBuf,

    /// True when `path` is the partial file still being written
    pub partial: bool,
}

/// Read-only view of a track's progressive download
///
/// Implemented by the download manager. The engine polls these from its
/// buffering and pre-roll controllers; no writes originate here.
pub trait DownloadMonitor: Send + Sync {
    /// Bytes written to the partial file so far
    fn bytes_written(&self) -> u64;

    /// True once the downloader has finished the whole file
    fn is_complete(&self) -> bool;

    /// Complete file if finished, otherwise the partial file
    fn best_source(&self) -> LocalSource;
}

/// One playable item: catalog metadata plus download observation
pub struct TrackHandle {
    track: Track,
    monitor: Arc<dyn DownloadMonitor>,
    playing: AtomicBool,
}

impl TrackHandle {
    pub fn new(track: Track, monitor: Arc<dyn DownloadMonitor>) -> Self {
        Self {
            track,
            monitor,
            playing: AtomicBool::new(false),
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn bit_rate_kbps(&self) -> u32 {
        self.track.bit_rate_kbps
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.track.duration_ms
    }

    pub fn bytes_written(&self) -> u64 {
        self.monitor.bytes_written()
    }

    pub fn is_download_complete(&self) -> bool {
        self.monitor.is_complete()
    }

    pub fn best_source(&self) -> LocalSource {
        self.monitor.best_source()
    }

    /// Mark whether this track is the item currently being rendered
    ///
    /// Toggled around restarts so the download subsystem can deprioritize
    /// a file the decoder is not actively reading.
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TrackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackHandle")
            .field("id", &self.track.id)
            .field("title", &self.track.title)
            .field("playing", &self.is_playing())
            .finish()
    }
}
