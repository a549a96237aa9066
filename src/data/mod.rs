// Data module - loaded datasets
//
// A dataset is the processed form of one complete sample dump: the segment
// set the composition layer reads, plus display totals and provenance.
// Datasets come from a recorded file, the chunked feed (`feed`), or the
// synthetic generator (`demo`).

pub mod demo;
pub mod feed;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    compute_summary, extract_segments, RawSample, Segment, SegmentSet, SAMPLE_RATE_HZ,
    SEGMENT_SECONDS,
};

pub use demo::{generate_demo_samples, generate_demo_segments, DEMO_SEGMENT_COUNT};
pub use feed::{FeedMessage, FeedState, FeedUpdate, SampleAccumulator};

/// Display totals for one dataset
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_steps: u64,
    /// Recording length rounded to whole minutes
    pub active_minutes: u64,
    pub total_fidgets: u64,
}

/// Where a dataset came from and how large it was
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub sample_count: usize,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub segment_count: usize,
}

/// Segments plus summary for one complete dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub segments: SegmentSet,
    pub summary: DatasetSummary,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    /// Reduce raw samples into a dataset.
    ///
    /// An empty dump still yields one neutral segment; the summary and
    /// metadata then report zero samples.
    pub fn from_samples(samples: &[RawSample]) -> Self {
        let segments = extract_segments(samples);
        let totals = compute_summary(&segments);
        let duration_seconds = samples.len() as f64 / SAMPLE_RATE_HZ as f64;

        let dataset = Self {
            summary: DatasetSummary {
                total_steps: totals.total_steps,
                active_minutes: (duration_seconds / 60.0).round() as u64,
                total_fidgets: totals.total_fidgets,
            },
            metadata: DatasetMetadata {
                sample_count: samples.len(),
                sample_rate: SAMPLE_RATE_HZ,
                duration_seconds,
                segment_count: segments.len(),
            },
            segments,
        };
        log::info!(
            "[Dataset] {} samples -> {} segments ({:.1} s)",
            dataset.metadata.sample_count,
            dataset.metadata.segment_count,
            duration_seconds
        );
        dataset
    }

    /// Wrap precomputed segments, e.g. from the demo generator.
    ///
    /// Metadata is reconstructed as if every segment had been a full window.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let segments = SegmentSet::from_segments(segments).unwrap_or_else(SegmentSet::neutral);
        let totals = compute_summary(&segments);
        let duration_seconds = (segments.len() as u32 * SEGMENT_SECONDS) as f64;

        Self {
            summary: DatasetSummary {
                total_steps: totals.total_steps,
                active_minutes: totals.active_segment_count as u64,
                total_fidgets: totals.total_fidgets,
            },
            metadata: DatasetMetadata {
                sample_count: segments.len() * (SAMPLE_RATE_HZ * SEGMENT_SECONDS) as usize,
                sample_rate: SAMPLE_RATE_HZ,
                duration_seconds,
                segment_count: segments.len(),
            },
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
