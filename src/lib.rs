// Bird Log Core - Motion-driven generative music engine
// Reduces a day of inertial samples to activity segments and composes an
// ambient piece from them against a shared playback clock

// Module declarations
pub mod analysis;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod music;
pub mod voice;

// Re-exports for convenience
pub use analysis::{extract_segments, map_to_params, MusicParams, RawSample, Segment, SegmentSet};
pub use config::AppConfig;
pub use data::{Dataset, FeedMessage, SampleAccumulator};
pub use engine::{Instrument, PlaybackController, PlaybackEvent, PlaybackState};
pub use error::{ConfigError, ErrorCode, FeedError, PlaybackError};
pub use music::{schedule_composition, Phrase, Scale, ScalePreset};
pub use voice::{Voice, VoiceBank, VoiceMix};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_from_samples_to_params() {
        let dataset = Dataset::from_samples(&[RawSample::at_rest(); 60]);
        let params = map_to_params(&dataset.segments()[0]);
        assert!(params.stillness);
    }
}
