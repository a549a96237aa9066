// Playback error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 3001-3002
pub struct PlaybackErrorCodes {}

impl PlaybackErrorCodes {
    /// Playback was requested for a dataset with no segments
    pub const EMPTY_DATASET: i32 = 3001;

    /// No async runtime was available to drive the playback timers
    pub const RUNTIME_UNAVAILABLE: i32 = 3002;
}

/// Log a playback error with structured context
///
/// Emits the numeric code, the component and the human-readable message
/// on one line so log scrapers can pick them apart.
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackController, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Playback-related errors
///
/// Only `EmptyDataset` is caused by caller input; `RuntimeUnavailable` means
/// the engine could not be driven at all. Redundant lifecycle calls (stopping an
/// idle engine) are no-ops and never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The segment set handed to `start` was empty
    EmptyDataset,

    /// `start` was called outside a tokio runtime
    RuntimeUnavailable { reason: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::EmptyDataset => PlaybackErrorCodes::EMPTY_DATASET,
            PlaybackError::RuntimeUnavailable { .. } => PlaybackErrorCodes::RUNTIME_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::EmptyDataset => "No data to play: segment set is empty".to_string(),
            PlaybackError::RuntimeUnavailable { reason } => {
                format!("No async runtime available for playback: {}", reason)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}
