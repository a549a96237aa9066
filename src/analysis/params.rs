// Music parameter mapping
//
// Pure clamped-linear transforms from one segment's statistics to the
// control values the composition layer reads. Nothing is cached; the mapping
// is cheap enough to recompute wherever it is needed.

use serde::{Deserialize, Serialize};

use super::segments::Segment;

/// Musical control values derived from one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicParams {
    /// Suggested tempo in BPM (60-100)
    pub tempo_bias: f64,
    /// Suggested loudness in dB (-24 to -6)
    pub loudness_db: f64,
    /// Notes per phrase slot (1-4)
    pub density: u8,
    /// Chance of a grace note (0-0.5)
    pub ornament_probability: f64,
    /// Melodic direction, -1 (down) to 1 (up)
    pub pitch_tendency: f64,
    /// Negligible motion; melodic notes are suppressed
    pub stillness: bool,
}

/// Map a segment to its musical parameters.
///
/// Formulas:
/// - tempo = clamp(60 + (avg_acc - 1) * 40, 60, 100)
/// - loudness = clamp(-24 + (max_acc - 1) * 9, -24, -6)
/// - density = clamp(floor(steps / 15) + 1, 1, 4)
/// - ornament = clamp(fidgets * 0.1, 0, 0.5)
/// - tendency = tanh(avg_rot * 2)
/// - stillness = avg_acc < 1.05 && steps < 5
pub fn map_to_params(segment: &Segment) -> MusicParams {
    MusicParams {
        tempo_bias: (60.0 + (segment.avg_acc - 1.0) * 40.0).clamp(60.0, 100.0),
        loudness_db: (-24.0 + (segment.max_acc - 1.0) * 9.0).clamp(-24.0, -6.0),
        density: (segment.steps / 15 + 1).min(4) as u8,
        ornament_probability: (segment.fidgets as f64 * 0.1).clamp(0.0, 0.5),
        pitch_tendency: (segment.avg_rot * 2.0).tanh(),
        stillness: segment.avg_acc < 1.05 && segment.steps < 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(avg_acc: f64, max_acc: f64, avg_rot: f64, steps: u32, fidgets: u32) -> Segment {
        Segment {
            avg_acc,
            max_acc,
            avg_rot,
            steps,
            fidgets,
        }
    }

    fn assert_in_range(params: &MusicParams) {
        assert!((60.0..=100.0).contains(&params.tempo_bias));
        assert!((-24.0..=-6.0).contains(&params.loudness_db));
        assert!((1..=4).contains(&params.density));
        assert!((0.0..=0.5).contains(&params.ornament_probability));
        assert!((-1.0..=1.0).contains(&params.pitch_tendency));
    }

    #[test]
    fn test_neutral_segment() {
        let params = map_to_params(&Segment::neutral());
        assert_eq!(params.tempo_bias, 60.0);
        assert_eq!(params.loudness_db, -24.0);
        assert_eq!(params.density, 1);
        assert_eq!(params.ornament_probability, 0.0);
        assert_eq!(params.pitch_tendency, 0.0);
        assert!(params.stillness);
    }

    #[test]
    fn test_linear_region() {
        let params = map_to_params(&segment(1.5, 2.0, 0.25, 31, 3));
        assert!((params.tempo_bias - 80.0).abs() < 1e-9);
        assert!((params.loudness_db - (-15.0)).abs() < 1e-9);
        assert_eq!(params.density, 3);
        assert!((params.ornament_probability - 0.3).abs() < 1e-9);
        assert!((params.pitch_tendency - 0.5_f64.tanh()).abs() < 1e-9);
        assert!(!params.stillness);
    }

    #[test]
    fn test_ranges_hold_for_degenerate_inputs() {
        let cases = [
            segment(0.0, 0.0, 0.0, 0, 0),
            segment(-5.0, -10.0, -3.0, 0, 0),
            segment(50.0, 80.0, 40.0, u32::MAX, u32::MAX),
            segment(1.04, 1.0, -0.2, 4, 1),
            segment(f64::MAX, f64::MAX, f64::MAX, 1000, 1000),
            segment(f64::MIN, f64::MIN, f64::MIN, 0, 0),
        ];
        for case in cases {
            assert_in_range(&map_to_params(&case));
        }
    }

    #[test]
    fn test_stillness_requires_both_conditions() {
        assert!(map_to_params(&segment(1.04, 1.2, 0.0, 4, 0)).stillness);
        assert!(!map_to_params(&segment(1.04, 1.2, 0.0, 5, 0)).stillness);
        assert!(!map_to_params(&segment(1.05, 1.2, 0.0, 0, 0)).stillness);
    }

    #[test]
    fn test_density_caps_at_four() {
        assert_eq!(map_to_params(&segment(1.0, 1.0, 0.0, 14, 0)).density, 1);
        assert_eq!(map_to_params(&segment(1.0, 1.0, 0.0, 15, 0)).density, 2);
        assert_eq!(map_to_params(&segment(1.0, 1.0, 0.0, 45, 0)).density, 4);
        assert_eq!(map_to_params(&segment(1.0, 1.0, 0.0, 400, 0)).density, 4);
    }
}
