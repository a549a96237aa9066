//! Phrase mutators.
//!
//! Each function takes a phrase by reference and returns a new one. The input
//! is never modified, so a seed can be cloned per repetition and pushed
//! through any combination of these in isolation.
//!
//! Randomised mutators take the RNG explicitly; callers that do not care
//! about reproducibility pass `rand::thread_rng()`.

use rand::Rng;

use super::phrase::{NoteSlot, Phrase};
use super::scale::Scale;

/// Length of an ornament grace note in seconds
pub const GRACE_NOTE_SECONDS: f64 = 0.08;

/// Clamp a per-note chance into [0, 1]. Non-finite input disables the mutation.
pub fn clamp_probability(probability: f64) -> f64 {
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Shift every note by `degrees` scale steps, clamped to the scale.
pub fn transpose_in_scale(phrase: &Phrase, scale: &Scale, degrees: i64) -> Phrase {
    let slots = phrase
        .slots()
        .iter()
        .map(|slot| match slot.degree {
            Some(degree) => NoteSlot {
                degree: Some(scale.clamp_degree(degree as i64 + degrees)),
                ..*slot
            },
            None => *slot,
        })
        .collect();
    phrase.with_slots(slots)
}

/// With `probability` per note, move it to a neighbouring scale degree.
pub fn substitute_notes<R: Rng + ?Sized>(
    phrase: &Phrase,
    scale: &Scale,
    probability: f64,
    rng: &mut R,
) -> Phrase {
    let probability = clamp_probability(probability);
    let slots = phrase
        .slots()
        .iter()
        .map(|slot| match slot.degree {
            Some(degree) if rng.gen_bool(probability) => {
                let step = if rng.gen_bool(0.5) { 1 } else { -1 };
                NoteSlot {
                    degree: Some(scale.clamp_degree(degree as i64 + step)),
                    ..*slot
                }
            }
            _ => *slot,
        })
        .collect();
    phrase.with_slots(slots)
}

/// With `probability` per note, turn it into a rest.
pub fn omit_notes<R: Rng + ?Sized>(phrase: &Phrase, probability: f64, rng: &mut R) -> Phrase {
    let probability = clamp_probability(probability);
    let slots = phrase
        .slots()
        .iter()
        .map(|slot| {
            if !slot.is_rest() && rng.gen_bool(probability) {
                slot.silenced()
            } else {
                *slot
            }
        })
        .collect();
    phrase.with_slots(slots)
}

/// Scale every velocity by `factor`, clamped to [0, 1].
pub fn apply_dynamics(phrase: &Phrase, factor: f64) -> Phrase {
    let slots = phrase
        .slots()
        .iter()
        .map(|slot| NoteSlot {
            velocity: (slot.velocity * factor).clamp(0.0, 1.0),
            ..*slot
        })
        .collect();
    phrase.with_slots(slots)
}

/// With `chance` per note, insert a grace note right after it.
///
/// The grace note sits one degree higher at half the velocity and starts
/// halfway through the original note. The original note is kept.
pub fn add_ornaments<R: Rng + ?Sized>(
    phrase: &Phrase,
    scale: &Scale,
    chance: f64,
    rng: &mut R,
) -> Phrase {
    let chance = clamp_probability(chance);
    let mut slots = Vec::with_capacity(phrase.len() * 2);
    for slot in phrase.slots() {
        slots.push(*slot);
        if let Some(degree) = slot.degree {
            if rng.gen_bool(chance) {
                slots.push(NoteSlot::note(
                    scale.clamp_degree(degree as i64 + 1),
                    GRACE_NOTE_SECONDS,
                    slot.velocity / 2.0,
                    slot.offset + slot.duration / 2.0,
                ));
            }
        }
    }
    phrase.with_slots(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::scale::ScalePreset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scale() -> Scale {
        Scale::from_preset(ScalePreset::Ambient)
    }

    fn sample_phrase() -> Phrase {
        Phrase::new(
            vec![
                NoteSlot::note(2, 0.64, 0.8, 0.0),
                NoteSlot::rest(0.64, 0.8),
                NoteSlot::note(4, 0.64, 0.6, 1.6),
                NoteSlot::note(3, 0.64, 1.0, 2.4),
                NoteSlot::note(5, 0.64, 0.4, 3.2),
                NoteSlot::rest(0.64, 4.0),
                NoteSlot::note(1, 0.64, 0.9, 4.8),
                NoteSlot::note(6, 0.64, 0.7, 5.6),
            ],
            6.4,
        )
    }

    fn degrees(phrase: &Phrase) -> Vec<Option<usize>> {
        phrase.slots().iter().map(|s| s.degree).collect()
    }

    #[test]
    fn test_transpose_roundtrip_without_clamping() {
        let phrase = sample_phrase();
        let up = transpose_in_scale(&phrase, &scale(), 1);
        let back = transpose_in_scale(&up, &scale(), -1);
        assert_eq!(back, phrase);
        assert_eq!(
            degrees(&up),
            vec![Some(3), None, Some(5), Some(4), Some(6), None, Some(2), Some(7)]
        );
    }

    #[test]
    fn test_transpose_clamps_to_scale() {
        let phrase = sample_phrase();
        let up = transpose_in_scale(&phrase, &scale(), 10);
        assert!(up.notes().all(|n| n.degree == Some(7)));
        let down = transpose_in_scale(&phrase, &scale(), -10);
        assert!(down.notes().all(|n| n.degree == Some(0)));
        assert_eq!(up.slots()[1], phrase.slots()[1]);
    }

    #[test]
    fn test_mutators_leave_input_untouched() {
        let phrase = sample_phrase();
        let saved = phrase.clone();
        let mut rng = StdRng::seed_from_u64(3);

        let outputs = vec![
            transpose_in_scale(&phrase, &scale(), 2),
            substitute_notes(&phrase, &scale(), 1.0, &mut rng),
            omit_notes(&phrase, 1.0, &mut rng),
            apply_dynamics(&phrase, 0.5),
            add_ornaments(&phrase, &scale(), 1.0, &mut rng),
        ];

        assert_eq!(phrase, saved);
        for output in &outputs[..4] {
            assert_eq!(output.len(), saved.len());
            let offsets: Vec<f64> = output.slots().iter().map(|s| s.offset).collect();
            let expected: Vec<f64> = saved.slots().iter().map(|s| s.offset).collect();
            assert_eq!(offsets, expected);
        }
    }

    #[test]
    fn test_substitute_moves_one_step() {
        let phrase = sample_phrase();
        let mut rng = StdRng::seed_from_u64(9);
        let swapped = substitute_notes(&phrase, &scale(), 1.0, &mut rng);
        for (before, after) in phrase.slots().iter().zip(swapped.slots()) {
            match (before.degree, after.degree) {
                (Some(a), Some(b)) => assert_eq!((a as i64 - b as i64).abs(), 1),
                (None, None) => {}
                other => panic!("rest state changed: {:?}", other),
            }
        }
        let untouched = substitute_notes(&phrase, &scale(), 0.0, &mut rng);
        assert_eq!(untouched, phrase);
    }

    #[test]
    fn test_omit_all_and_none() {
        let phrase = sample_phrase();
        let mut rng = StdRng::seed_from_u64(1);
        let silent = omit_notes(&phrase, 1.0, &mut rng);
        assert!(silent.is_silent());
        assert!(silent.slots().iter().all(|s| s.velocity == 0.0));
        assert_eq!(omit_notes(&phrase, 0.0, &mut rng), phrase);
    }

    #[test]
    fn test_dynamics_clamps() {
        let phrase = sample_phrase();
        let loud = apply_dynamics(&phrase, 2.0);
        assert!(loud.slots().iter().all(|s| s.velocity <= 1.0));
        assert_eq!(loud.slots()[0].velocity, 1.0);
        let quiet = apply_dynamics(&phrase, 0.5);
        assert!((quiet.slots()[0].velocity - 0.4).abs() < 1e-9);
        let muted = apply_dynamics(&phrase, -1.0);
        assert!(muted.slots().iter().all(|s| s.velocity == 0.0));
    }

    #[test]
    fn test_ornaments_follow_their_note() {
        let phrase = sample_phrase();
        let mut rng = StdRng::seed_from_u64(5);
        let ornamented = add_ornaments(&phrase, &scale(), 1.0, &mut rng);
        let note_count = phrase.notes().count();
        assert_eq!(ornamented.len(), phrase.len() + note_count);

        // First note at degree 2 is followed by its grace note at degree 3
        let original = ornamented.slots()[0];
        let grace = ornamented.slots()[1];
        assert_eq!(grace.degree, Some(3));
        assert!((grace.velocity - original.velocity / 2.0).abs() < 1e-9);
        assert!((grace.offset - (original.offset + original.duration / 2.0)).abs() < 1e-9);
        assert_eq!(grace.duration, GRACE_NOTE_SECONDS);

        // Top of the scale clamps instead of overflowing
        let top = Phrase::new(vec![NoteSlot::note(7, 0.5, 0.5, 0.0)], 1.0);
        let clamped = add_ornaments(&top, &scale(), 1.0, &mut rng);
        assert_eq!(clamped.slots()[1].degree, Some(7));

        assert_eq!(add_ornaments(&phrase, &scale(), 0.0, &mut rng), phrase);
    }

    #[test]
    fn test_non_finite_chance_leaves_phrase_unchanged() {
        let phrase = sample_phrase();
        let mut rng = StdRng::seed_from_u64(13);
        for chance in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(substitute_notes(&phrase, &scale(), chance, &mut rng), phrase);
            assert_eq!(omit_notes(&phrase, chance, &mut rng), phrase);
            assert_eq!(add_ornaments(&phrase, &scale(), chance, &mut rng), phrase);
        }
        assert_eq!(clamp_probability(2.0), 1.0);
        assert_eq!(clamp_probability(-0.5), 0.0);
    }
}
