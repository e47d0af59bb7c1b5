//! Error types for the timeline.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by timeline operations.
///
/// Every public operation validates its own input and reports the specific
/// variant. Nothing is retried: all of these are caller-input or host
/// capability problems, never transient ones.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// The host timing store failed its capability check at construction
    #[error("Can't continue because the required timing capabilities are not supported by this host")]
    NotCompatible,

    /// No handle was given
    #[error("Can't create a mark because a handle wasn't given for it")]
    MissingHandle,

    /// Handle contains the namespace separator
    #[error("The given handle contains the namespace delimiter")]
    HandleContainsNamespaceDelimiter,

    /// Handle contains the segment delimiter
    #[error("The given handle contains the segment delimiter")]
    HandleContainsSegmentDelimiter,

    /// A final mark was already recorded for the handle
    #[error("Can't create a mark for the given handle because it is locked")]
    EntryLocked,

    /// The handle has never been marked
    #[error("The given handle doesn't have any marks associated with it")]
    HandleNotFound,

    /// Fewer than two marks exist for the handle
    #[error("The given handle must have at least two associated marks in order to make a measurement")]
    InsufficientMarks,

    /// Segment bounds are out of range or do not span a gap
    #[error("The given measurement range is not valid for the handle given")]
    InvalidRange,

    /// Entry kind token was neither "marks" nor "measures"
    #[error("Expected an entry kind of either \"marks\" or \"measures\"")]
    InvalidToken,

    /// A name filter pattern failed to compile
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex_lite::Error),

    /// Construction options are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host store rejected a request
    #[error("Timing store error: {0}")]
    Store(#[from] StoreError),

    /// Failed to serialize an export
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;
