// Segments - motion feature extraction
//
// This module reduces a day of 20 Hz inertial samples into fixed 3-second
// segments. Each segment summarises how much the bird moved during that
// window, which is all the composition layer ever looks at.
//
// Features extracted per segment:
// 1. Average acceleration magnitude (gravity-normalised, 1.0 = at rest)
// 2. Maximum acceleration magnitude
// 3. Average rotation magnitude (rad/s)
// 4. Step estimate: samples deviating from 1g by more than 0.3, divided by 4
// 5. Fidget count: samples rotating faster than 1 rad/s

use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Sampling rate of the motion sensor in Hz
pub const SAMPLE_RATE_HZ: u32 = 20;

/// Length of one segment in seconds
pub const SEGMENT_SECONDS: u32 = 3;

/// Number of raw samples aggregated into one segment
pub const SAMPLES_PER_SEGMENT: usize = (SAMPLE_RATE_HZ * SEGMENT_SECONDS) as usize;

/// Deviation from 1g above which a sample counts as a step detection
const STEP_THRESHOLD_G: f64 = 0.3;

/// Raw step detections per actual step. Tuned for the logger's sampling
/// characteristics, not derived.
const STEP_OVERSAMPLING: f64 = 4.0;

/// Rotation rate above which a sample counts as a fidget
const FIDGET_THRESHOLD_RAD_S: f64 = 1.0;

/// One accelerometer + gyroscope reading.
///
/// Serialised as the 6-tuple `[ax, ay, az, gx, gy, gz]` used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct RawSample {
    /// Acceleration in g
    pub accel: [f64; 3],
    /// Angular velocity in rad/s
    pub gyro: [f64; 3],
}

impl RawSample {
    pub fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self { accel, gyro }
    }

    /// A bird sitting still: gravity on z, no rotation.
    pub fn at_rest() -> Self {
        Self::new([0.0, 0.0, 1.0], [0.0, 0.0, 0.0])
    }

    #[inline]
    pub fn accel_magnitude(&self) -> f64 {
        let [x, y, z] = self.accel;
        (x * x + y * y + z * z).sqrt()
    }

    #[inline]
    pub fn gyro_magnitude(&self) -> f64 {
        let [x, y, z] = self.gyro;
        (x * x + y * y + z * z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.accel.iter().chain(self.gyro.iter()).all(|v| v.is_finite())
    }
}

impl From<[f64; 6]> for RawSample {
    fn from(t: [f64; 6]) -> Self {
        Self::new([t[0], t[1], t[2]], [t[3], t[4], t[5]])
    }
}

impl From<RawSample> for [f64; 6] {
    fn from(s: RawSample) -> Self {
        [
            s.accel[0], s.accel[1], s.accel[2], s.gyro[0], s.gyro[1], s.gyro[2],
        ]
    }
}

/// Summary statistics for one fixed-length window of samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Mean acceleration magnitude in g
    pub avg_acc: f64,
    /// Peak acceleration magnitude in g
    pub max_acc: f64,
    /// Mean rotation magnitude in rad/s
    pub avg_rot: f64,
    /// Estimated step count
    pub steps: u32,
    /// Raw fidget detections
    #[serde(alias = "fidget_events")]
    pub fidgets: u32,
}

impl Segment {
    /// Rest values used when there is no data at all
    pub fn neutral() -> Self {
        Self {
            avg_acc: 1.0,
            max_acc: 1.0,
            avg_rot: 0.0,
            steps: 0,
            fidgets: 0,
        }
    }

    /// Whether the segment counts towards the active-time summary
    pub fn is_active(&self) -> bool {
        self.avg_acc > 1.1 || self.steps > 10
    }

    /// Aggregate one window of samples. `window` must not be empty.
    fn from_window(window: &[RawSample]) -> Self {
        let mut sum_acc = 0.0;
        let mut max_acc = 0.0_f64;
        let mut sum_rot = 0.0;
        let mut step_hits = 0u32;
        let mut fidgets = 0u32;

        for sample in window {
            let acc = sample.accel_magnitude();
            let rot = sample.gyro_magnitude();
            sum_acc += acc;
            max_acc = max_acc.max(acc);
            sum_rot += rot;
            if (acc - 1.0).abs() > STEP_THRESHOLD_G {
                step_hits += 1;
            }
            if rot > FIDGET_THRESHOLD_RAD_S {
                fidgets += 1;
            }
        }

        let n = window.len() as f64;
        Self {
            avg_acc: sum_acc / n,
            max_acc,
            avg_rot: sum_rot / n,
            steps: (step_hits as f64 / STEP_OVERSAMPLING).round() as u32,
            fidgets,
        }
    }
}

/// Non-empty, read-only sequence of segments for one dataset.
///
/// Every consumer downstream of extraction indexes into this set, so it is
/// impossible to construct one without at least a single segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SegmentSet(Vec<Segment>);

impl SegmentSet {
    /// Wrap precomputed segments; `None` when `segments` is empty.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// Set holding one neutral segment
    pub fn neutral() -> Self {
        Self(vec![Segment::neutral()])
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Segment> {
        self.0
    }
}

impl Deref for SegmentSet {
    type Target = [Segment];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SegmentSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let segments = Vec::<Segment>::deserialize(deserializer)?;
        Ok(Self::from_segments(segments).unwrap_or_else(Self::neutral))
    }
}

/// Partition samples into consecutive 60-sample segments.
///
/// The final partial window is kept as-is. An empty input yields exactly one
/// neutral segment.
pub fn extract_segments(samples: &[RawSample]) -> SegmentSet {
    let segments: Vec<Segment> = samples
        .chunks(SAMPLES_PER_SEGMENT)
        .map(Segment::from_window)
        .collect();

    SegmentSet::from_segments(segments).unwrap_or_else(SegmentSet::neutral)
}

/// Display totals for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total_steps: u64,
    pub active_segment_count: usize,
    pub total_fidgets: u64,
}

/// Sum steps and fidgets and count active segments.
pub fn compute_summary(segments: &[Segment]) -> ActivitySummary {
    segments
        .iter()
        .fold(ActivitySummary::default(), |mut acc, segment| {
            acc.total_steps += segment.steps as u64;
            acc.total_fidgets += segment.fidgets as u64;
            if segment.is_active() {
                acc.active_segment_count += 1;
            }
            acc
        })
}
