// Analysis module - motion data reduction
//
// Converts the raw sensor stream into the per-segment statistics and
// musical control values that drive composition.
//
// Pipeline: RawSample[] → extract_segments → SegmentSet → map_to_params

pub mod params;
pub mod segments;

pub use params::{map_to_params, MusicParams};
pub use segments::{
    compute_summary, extract_segments, ActivitySummary, RawSample, Segment, SegmentSet,
    SAMPLES_PER_SEGMENT, SAMPLE_RATE_HZ, SEGMENT_SECONDS,
};
