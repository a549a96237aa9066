//! Seed phrase generation.
//!
//! The seed is the one motif a composition is built from: two bars of four
//! beats, each beat reflecting one segment sampled evenly across the whole
//! day.

use rand::Rng;

use crate::analysis::{map_to_params, Segment};

use super::phrase::{NoteSlot, Phrase};
use super::scale::Scale;

/// Slots in a seed phrase (two 4-beat bars)
pub const SEED_SLOTS: usize = 8;

/// Fraction of a beat a note sounds for; the remainder keeps consecutive
/// triggers from overlapping on sustained voices.
const NOTE_LENGTH_RATIO: f64 = 0.8;

/// Pick a scale degree biased towards `tendency` (-1 low .. 1 high).
///
/// `index = floor(((t + 1) / 2 * 0.6 + r * 0.4) * len)` with `r` uniform in
/// [0, 1), clamped to the scale.
pub fn select_note<R: Rng + ?Sized>(scale: &Scale, tendency: f64, rng: &mut R) -> usize {
    let bias = (tendency.clamp(-1.0, 1.0) + 1.0) / 2.0 * 0.6;
    let position = bias + rng.gen::<f64>() * 0.4;
    let index = (position * scale.len() as f64).floor();
    scale.clamp_degree(index as i64)
}

/// Velocity for a seed note: 0.3 at rest rising to 1.0 at 1.5g average.
pub fn seed_velocity(segment: &Segment) -> f64 {
    (0.3 + (segment.avg_acc - 1.0) * 1.4).clamp(0.3, 1.0)
}

/// Build the seed phrase using the thread-local RNG.
pub fn generate_seed(segments: &[Segment], scale: &Scale, tempo: f64) -> Phrase {
    generate_seed_with_rng(segments, scale, tempo, &mut rand::thread_rng())
}

/// Build the seed phrase from 8 evenly spaced segments.
///
/// Slot `i` reads segment `floor(i * N / 8)`. Still segments become rests.
/// An empty `segments` slice is treated as a single neutral segment.
pub fn generate_seed_with_rng<R: Rng + ?Sized>(
    segments: &[Segment],
    scale: &Scale,
    tempo: f64,
    rng: &mut R,
) -> Phrase {
    let beat = 60.0 / super::clamp_tempo(tempo);
    let note_length = beat * NOTE_LENGTH_RATIO;
    let neutral = [Segment::neutral()];
    let source = if segments.is_empty() { &neutral[..] } else { segments };
    let n = source.len();

    let slots = (0..SEED_SLOTS)
        .map(|i| {
            let segment = &source[i * n / SEED_SLOTS];
            let params = map_to_params(segment);
            let offset = i as f64 * beat;
            if params.stillness {
                NoteSlot::rest(note_length, offset)
            } else {
                let degree = select_note(scale, params.pitch_tendency, rng);
                NoteSlot::note(degree, note_length, seed_velocity(segment), offset)
            }
        })
        .collect();

    Phrase::new(slots, SEED_SLOTS as f64 * beat)
}
