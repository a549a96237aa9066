// Music module - data-driven composition
//
// Turns a segment set into timed musical events:
// SegmentSet → seed phrase → mutated repetitions + bass + pads + percussion
// → Scheduler::schedule_at
//
// Nothing in here touches a clock or an instrument directly; scheduling is
// expressed through the `Scheduler` trait so the whole pass can run against
// a recording scheduler in tests.

pub mod mutate;
pub mod phrase;
pub mod scale;
pub mod schedule;
pub mod seed;

pub use phrase::{NoteSlot, Phrase};
pub use scale::{Pitch, Scale, ScalePreset};
pub use schedule::{
    schedule_composition, CompositionLayout, CompositionScheduler, EventHandle, MusicEvent,
    PercussionKind, Scheduler,
};
pub use seed::{generate_seed, select_note, SEED_SLOTS};

/// Slowest accepted tempo in BPM
pub const MIN_TEMPO_BPM: f64 = 40.0;

/// Fastest accepted tempo in BPM
pub const MAX_TEMPO_BPM: f64 = 140.0;

/// Default transport tempo in BPM
pub const DEFAULT_TEMPO_BPM: f64 = 75.0;

/// Clamp a tempo into the accepted band. Non-finite input falls back to the
/// default.
pub fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
    } else {
        DEFAULT_TEMPO_BPM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_tempo() {
        assert_eq!(clamp_tempo(75.0), 75.0);
        assert_eq!(clamp_tempo(0.0), MIN_TEMPO_BPM);
        assert_eq!(clamp_tempo(-20.0), MIN_TEMPO_BPM);
        assert_eq!(clamp_tempo(999.0), MAX_TEMPO_BPM);
        assert_eq!(clamp_tempo(f64::NAN), DEFAULT_TEMPO_BPM);
    }
}
