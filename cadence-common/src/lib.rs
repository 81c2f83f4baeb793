//! # Cadence shared types (cadence-common)
//!
//! Shared type definitions for the Cadence streaming client: the player
//! state machine enum, track metadata, and the event types + `EventBus`
//! used to publish playback notifications to the UI and remote-control
//! layers.

pub mod events;
pub mod state;
pub mod types;

pub use events::{EventBus, PlayerEvent};
pub use state::PlayerState;
pub use types::Track;
