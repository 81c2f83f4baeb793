//! Track metadata shared between the engine and its consumers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one playable track
///
/// Owned by the download-queue subsystem; the engine and event consumers
/// hold shared references and snapshots of this record. Duration and
/// bitrate come from the server catalog and may be absent or approximate
/// for transcoded streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Stable song identifier
    pub id: Uuid,

    /// Song title
    pub title: Option<String>,

    /// Artist name
    pub artist: Option<String>,

    /// Album name
    pub album: Option<String>,

    /// Expected duration in milliseconds, when the catalog knows it
    pub duration_ms: Option<u64>,

    /// Expected bitrate in kbit/s
    pub bit_rate_kbps: u32,

    /// Content type the server transcodes to, if any
    ///
    /// When set, the reported stream bitrate no longer matches the file on
    /// disk, so download-progress percentages are not mirrored to the UI.
    pub transcoded_content_type: Option<String>,
}

impl Track {
    /// Minimal track record with a fresh id
    pub fn new(bit_rate_kbps: u32, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: None,
            artist: None,
            album: None,
            duration_ms,
            bit_rate_kbps,
            transcoded_content_type: None,
        }
    }
}
