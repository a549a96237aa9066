// Sample feed error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sample feed error code constants
///
/// Error code range: 5001-5004
pub struct FeedErrorCodes {}

impl FeedErrorCodes {
    /// A data chunk or end marker arrived outside a dump
    pub const UNEXPECTED_MESSAGE: i32 = 5001;

    /// A sample tuple contained a non-finite value
    pub const MALFORMED_SAMPLE: i32 = 5002;

    /// The accumulator has no dump in progress
    pub const NOT_RECEIVING: i32 = 5003;

    /// A transport message could not be decoded
    pub const DECODE: i32 = 5004;
}

/// Log a feed error with structured context
pub fn log_feed_error(err: &FeedError, context: &str) {
    error!(
        "Feed error in {}: code={}, component=SampleAccumulator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while assembling raw samples from a chunked transport
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Message type not valid in the accumulator's current state
    UnexpectedMessage { kind: String },

    /// Sample at `index` of the dump held a NaN or infinite value
    MalformedSample { index: usize },

    /// No dump in progress
    NotReceiving,

    /// Raw message text could not be decoded
    Decode { details: String },
}

impl ErrorCode for FeedError {
    fn code(&self) -> i32 {
        match self {
            FeedError::UnexpectedMessage { .. } => FeedErrorCodes::UNEXPECTED_MESSAGE,
            FeedError::MalformedSample { .. } => FeedErrorCodes::MALFORMED_SAMPLE,
            FeedError::NotReceiving => FeedErrorCodes::NOT_RECEIVING,
            FeedError::Decode { .. } => FeedErrorCodes::DECODE,
        }
    }

    fn message(&self) -> String {
        match self {
            FeedError::UnexpectedMessage { kind } => {
                format!("Unexpected '{}' message outside a dump", kind)
            }
            FeedError::MalformedSample { index } => {
                format!("Sample {} contains a non-finite value", index)
            }
            FeedError::NotReceiving => "No sample dump in progress".to_string(),
            FeedError::Decode { details } => format!("Failed to decode message: {}", details),
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeedError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FeedError {}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_codes() {
        assert_eq!(
            FeedError::UnexpectedMessage {
                kind: "data_chunk".to_string()
            }
            .code(),
            FeedErrorCodes::UNEXPECTED_MESSAGE
        );
        assert_eq!(
            FeedError::MalformedSample { index: 3 }.code(),
            FeedErrorCodes::MALFORMED_SAMPLE
        );
        assert_eq!(FeedError::NotReceiving.code(), FeedErrorCodes::NOT_RECEIVING);
    }

    #[test]
    fn test_feed_error_messages() {
        let err = FeedError::MalformedSample { index: 42 };
        assert!(err.message().contains("42"));

        let err = FeedError::UnexpectedMessage {
            kind: "dump_end".to_string(),
        };
        assert!(err.message().contains("dump_end"));
    }
}
