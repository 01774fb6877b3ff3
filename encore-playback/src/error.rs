//! Error types for encore-playback
//!
//! Queue contract violations are kept in their own [`QueueError`] type so
//! callers can tell a bad request apart from an engine or storage failure.

use crate::playback::queue::QueueError;
use thiserror::Error;

/// Main error type for encore-playback
#[derive(Error, Debug)]
pub enum Error {
    /// Queue contract violation (bad index or command)
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Operation needs an attached state holder
    #[error("No playback state holder attached: {0}")]
    NoHolder(String),

    /// Call made with a handle for a holder that is no longer attached
    #[error("Stale holder handle {0}")]
    StaleHolder(u64),

    /// Audio engine failure (load, decode, output)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Saved state could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Library or configuration errors
    #[error(transparent)]
    Common(#[from] encore_common::Error),
}

/// Convenience Result type using encore-playback Error
pub type Result<T> = std::result::Result<T, Error>;
