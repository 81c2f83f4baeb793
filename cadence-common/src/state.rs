//! Player state machine enumeration
//!
//! One `PlayerState` is tracked per decoder role (current and next). The
//! two machines are independent except that the next role's
//! `Prepared` -> active promotion is gated on the current role reaching
//! `Completed`.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a decoder role
///
/// Transitions for the current role:
/// `Idle -> Downloading -> Preparing -> Prepared -> Started <-> Paused -> Completed`,
/// then back to `Idle` for the next cycle. `Completed` may re-enter
/// `Downloading`/`Preparing` when a completion turns out to be spurious
/// (decoder hit the current end of a still-growing file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// No source configured
    Idle,
    /// Waiting for the partial file to reach the buffer target
    Downloading,
    /// Source configured, asynchronous preparation in flight
    Preparing,
    /// Prepared and ready to start
    Prepared,
    /// Actively rendering audio
    Started,
    /// Prepared/started but held
    Paused,
    /// Reached end of track
    Completed,
}

impl PlayerState {
    /// True while the decoder is actively holding a prepared source
    /// (position and duration queries are meaningful).
    pub fn is_prepared(&self) -> bool {
        !matches!(
            self,
            PlayerState::Idle | PlayerState::Downloading | PlayerState::Preparing
        )
    }

    /// True when audio is rendering or held mid-track
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Started | PlayerState::Paused)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Downloading => write!(f, "downloading"),
            PlayerState::Preparing => write!(f, "preparing"),
            PlayerState::Prepared => write!(f, "prepared"),
            PlayerState::Started => write!(f, "started"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Completed => write!(f, "completed"),
        }
    }
}
