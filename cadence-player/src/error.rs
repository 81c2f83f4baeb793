//! Error types for cadence-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Playback-mutating engine operations never surface these to
//! callers; they feed the reset-and-recover paths instead.

use thiserror::Error;

/// Main error type for the playback engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying decoder/renderer engine errors
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Local source selection / loopback proxy errors
    #[error("Source error: {0}")]
    Source(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using cadence-player Error
pub type Result<T> = std::result::Result<T, Error>;
