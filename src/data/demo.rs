// Synthetic day of bird motion for running without hardware.
//
// Activity follows a fixed daily curve indexed by segment: a morning burst,
// midday activity, an afternoon lull and some evening movement.

use rand::Rng;

use crate::analysis::{RawSample, Segment, SAMPLES_PER_SEGMENT};

/// Segments in one demo day
pub const DEMO_SEGMENT_COUNT: usize = 720;

/// Activity level (0..1) for the segment at `index`.
pub fn activity_at(index: usize) -> f64 {
    let hour = index as f64 / 60.0;
    if (1.0..=3.0).contains(&hour) {
        0.8
    } else if (5.0..=7.0).contains(&hour) {
        0.6
    } else if (8.0..=10.0).contains(&hour) {
        0.3
    } else if hour >= 11.0 {
        0.5
    } else {
        0.4
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One demo segment at the given activity level.
fn demo_segment<R: Rng + ?Sized>(activity: f64, rng: &mut R) -> Segment {
    let random_factor = 0.5 + rng.gen::<f64>();
    let avg_acc = 1.0 + activity * random_factor * 0.5;
    let max_acc = avg_acc + rng.gen::<f64>() * activity * 2.0;
    let avg_rot = (rng.gen::<f64>() - 0.5) * activity * 0.5;

    let steps = if activity > 0.4 {
        (rng.gen::<f64>() * activity * 100.0).floor() as u32
    } else {
        0
    };
    let fidgets = if rng.gen::<f64>() < activity * 0.3 {
        rng.gen_range(0..5)
    } else {
        0
    };

    Segment {
        avg_acc: round2(avg_acc),
        max_acc: round2(max_acc),
        avg_rot: round2(avg_rot),
        steps,
        fidgets,
    }
}

/// Generate a full demo day of precomputed segments.
pub fn generate_demo_segments<R: Rng + ?Sized>(rng: &mut R) -> Vec<Segment> {
    let segments: Vec<Segment> = (0..DEMO_SEGMENT_COUNT)
        .map(|index| demo_segment(activity_at(index), rng))
        .collect();
    log::debug!("[Demo] Generated {} segments", segments.len());
    segments
}

/// Generate raw 20 Hz samples covering `segment_count` segments.
///
/// Each sample is a resting reading with a chance of motion proportional to
/// the curve's activity, so the extractor sees steps and fidgets in the
/// same places the segment generator puts them.
pub fn generate_demo_samples<R: Rng + ?Sized>(segment_count: usize, rng: &mut R) -> Vec<RawSample> {
    let mut samples = Vec::with_capacity(segment_count * SAMPLES_PER_SEGMENT);
    for index in 0..segment_count {
        let activity = activity_at(index);
        for _ in 0..SAMPLES_PER_SEGMENT {
            let mut sample = RawSample::at_rest();
            if rng.gen::<f64>() < activity * 0.5 {
                let jolt = rng.gen_range(-1.0..1.0) * activity;
                sample.accel = [
                    rng.gen_range(-0.2..0.2) * activity,
                    jolt * 0.6,
                    1.0 + jolt,
                ];
            }
            if rng.gen::<f64>() < activity * 0.1 {
                sample.gyro = [
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(-0.5..0.5),
                ];
            }
            samples.push(sample);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extract_segments;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_activity_curve() {
        assert_eq!(activity_at(0), 0.4);
        assert_eq!(activity_at(60), 0.8);
        assert_eq!(activity_at(180), 0.8);
        assert_eq!(activity_at(181), 0.4);
        assert_eq!(activity_at(300), 0.6);
        assert_eq!(activity_at(500), 0.3);
        assert_eq!(activity_at(650), 0.4);
        assert_eq!(activity_at(719), 0.5);
    }

    #[test]
    fn test_demo_segments_follow_curve() {
        let mut rng = StdRng::seed_from_u64(7);
        let segments = generate_demo_segments(&mut rng);
        assert_eq!(segments.len(), DEMO_SEGMENT_COUNT);

        for (index, segment) in segments.iter().enumerate() {
            let activity = activity_at(index);
            assert!(segment.avg_acc >= 1.0);
            assert!(segment.avg_acc <= 1.0 + activity * 0.75 + 0.01);
            assert!(segment.max_acc >= segment.avg_acc);
            assert!(segment.avg_rot.abs() <= activity * 0.25 + 0.01);
            assert!(segment.fidgets < 5);
            if activity <= 0.4 {
                assert_eq!(segment.steps, 0);
            }
            assert_eq!(round2(segment.avg_acc), segment.avg_acc);
        }
    }

    #[test]
    fn test_demo_samples_extract_to_requested_length() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples = generate_demo_samples(12, &mut rng);
        assert_eq!(samples.len(), 12 * SAMPLES_PER_SEGMENT);
        assert!(samples.iter().all(RawSample::is_finite));

        let segments = extract_segments(&samples);
        assert_eq!(segments.len(), 12);
        assert!(segments.iter().all(|s| s.avg_acc >= 0.0));
    }
}
