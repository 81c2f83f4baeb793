//! Background task primitives
//!
//! The engine's controllers (buffering, pre-roll, position cache) run on
//! their own tokio tasks with cooperative sleep-and-check loops. They
//! never hold the engine lock while sleeping; cancellation is a shared
//! atomic flag checked after every sleep.

use cadence_common::PlayerState;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for a background task
///
/// Cancelling is idempotent and has no effect on an already-finished
/// task; the task simply exits without side effects at its next check.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Lock-free mirror of the current role's [`PlayerState`]
///
/// Written by the engine (under its lock) on every transition; read by
/// poll loops that must not contend for the engine lock.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub fn new(state: PlayerState) -> Self {
        Self {
            state: AtomicU8::new(encode(state)),
        }
    }

    pub fn set(&self, state: PlayerState) {
        self.state.store(encode(state), Ordering::Release);
    }

    pub fn get(&self) -> PlayerState {
        decode(self.state.load(Ordering::Acquire))
    }
}

fn encode(state: PlayerState) -> u8 {
    match state {
        PlayerState::Idle => 0,
        PlayerState::Downloading => 1,
        PlayerState::Preparing => 2,
        PlayerState::Prepared => 3,
        PlayerState::Started => 4,
        PlayerState::Paused => 5,
        PlayerState::Completed => 6,
    }
}

fn decode(value: u8) -> PlayerState {
    match value {
        0 => PlayerState::Idle,
        1 => PlayerState::Downloading,
        2 => PlayerState::Preparing,
        3 => PlayerState::Prepared,
        4 => PlayerState::Started,
        5 => PlayerState::Paused,
        _ => PlayerState::Completed,
    }
}
