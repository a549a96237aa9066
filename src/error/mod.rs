// Error types for the bird log engine
//
// This module defines the typed errors for playback, configuration and the
// sample feed, each carrying a stable numeric code for callers that only see
// the error across a process or UI boundary.

mod config;
mod feed;
mod playback;

pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use feed::{log_feed_error, FeedError, FeedErrorCodes};
pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and any embedding UI.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait_objects() {
        let errors: Vec<Box<dyn ErrorCode>> = vec![
            Box::new(PlaybackError::EmptyDataset),
            Box::new(ConfigError::UnknownScale {
                name: "lydian".to_string(),
            }),
            Box::new(FeedError::NotReceiving),
        ];

        let codes: Vec<i32> = errors.iter().map(|err| err.code()).collect();
        assert_eq!(codes, vec![3001, 4003, 5003]);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), PlaybackError> {
            Err(PlaybackError::EmptyDataset)
        }

        fn caller() -> Result<(), PlaybackError> {
            may_fail()?;
            Ok(())
        }

        assert_eq!(caller(), Err(PlaybackError::EmptyDataset));
    }
}
