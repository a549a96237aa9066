//! Composition scheduling.
//!
//! One pass lays out every event of a piece against an absolute timeline
//! (seconds from transport start):
//!
//! - **Lead**: the seed phrase repeated end to end, each repetition mutated
//!   according to the slice of the day it lines up with.
//! - **Bass**: a root held for several repetitions, changing every 3-5.
//! - **Pads**: a soft chord every 4-8 segments.
//! - **Percussion**: per-segment chance of a strike, tick or accent. Driven by
//!   segment index rather than phrase repetition so short bursts of motion
//!   still register.
//!
//! All layers are submitted through [`Scheduler::schedule_at`]; the returned
//! handles are the caller's means of cancelling the piece.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analysis::{map_to_params, Segment, SegmentSet};
use crate::engine::backend::Instrument;
use crate::voice::Voice;

use super::mutate::{
    add_ornaments, apply_dynamics, clamp_probability, omit_notes, substitute_notes,
    transpose_in_scale,
};
use super::phrase::Phrase;
use super::scale::{Pitch, Scale};
use super::seed::generate_seed_with_rng;

const BASS_CHANGE_MIN_REPS: usize = 3;
const BASS_CHANGE_MAX_REPS: usize = 5;
const BASS_MAX_HOLD_REPS: usize = 4;
const BASS_VELOCITY: f64 = 0.45;

const PAD_MIN_GAP_SEGMENTS: usize = 4;
const PAD_MAX_GAP_SEGMENTS: usize = 8;
const PAD_HOLD_SEGMENTS: f64 = 6.0;

const LOW_STRIKE_CHANCE: f64 = 0.2;
const TICK_CHANCE: f64 = 0.3;

/// Opaque handle for one scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventHandle(u64);

impl EventHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Percussion voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercussionKind {
    /// Soft low membrane hit
    LowStrike,
    /// Light high-frequency tick
    Tick,
    /// Occasional metallic accent
    MetalAccent,
}

/// A timed trigger for one layer of the piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum MusicEvent {
    Lead {
        pitch: Pitch,
        duration: f64,
        velocity: f64,
    },
    Bass {
        pitch: Pitch,
        duration: f64,
        velocity: f64,
    },
    Pad {
        pitches: Vec<Pitch>,
        duration: f64,
        velocity: f64,
    },
    Percussion {
        kind: PercussionKind,
        velocity: f64,
    },
}

impl MusicEvent {
    pub fn voice(&self) -> Voice {
        match self {
            MusicEvent::Lead { .. } => Voice::Lead,
            MusicEvent::Bass { .. } => Voice::Bass,
            MusicEvent::Pad { .. } => Voice::Pad,
            MusicEvent::Percussion { .. } => Voice::Percussion,
        }
    }

    /// Fire this event on `instrument` at transport time `time`.
    pub fn dispatch(&self, instrument: &dyn Instrument, time: f64) {
        match self {
            MusicEvent::Lead {
                pitch,
                duration,
                velocity,
            } => instrument.trigger_note(Voice::Lead, *pitch, *duration, time, *velocity),
            MusicEvent::Bass {
                pitch,
                duration,
                velocity,
            } => instrument.trigger_note(Voice::Bass, *pitch, *duration, time, *velocity),
            MusicEvent::Pad {
                pitches,
                duration,
                velocity,
            } => {
                for pitch in pitches {
                    instrument.trigger_note(Voice::Pad, *pitch, *duration, time, *velocity);
                }
            }
            MusicEvent::Percussion { kind, velocity } => {
                instrument.trigger_percussion(*kind, time, *velocity)
            }
        }
    }
}

/// Registers an event to fire at an absolute transport time (seconds).
pub trait Scheduler {
    fn schedule_at(&self, time: f64, event: MusicEvent) -> EventHandle;
}

/// How the seed phrase tiles the piece
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositionLayout {
    pub total_duration: f64,
    pub phrase_duration: f64,
    pub repetitions: usize,
    pub segments_per_cycle: usize,
}

impl CompositionLayout {
    pub fn new(segment_count: usize, seconds_per_segment: f64, phrase_duration: f64) -> Self {
        let total_duration = segment_count as f64 * seconds_per_segment;
        let repetitions = ((total_duration / phrase_duration).floor() as usize).max(1);
        let segments_per_cycle = (segment_count / repetitions).max(1);
        Self {
            total_duration,
            phrase_duration,
            repetitions,
            segments_per_cycle,
        }
    }

    /// Segments repetition `r` lines up with; empty past the end of the data.
    pub fn window<'a>(&self, segments: &'a [Segment], repetition: usize) -> &'a [Segment] {
        let start = (repetition * self.segments_per_cycle).min(segments.len());
        let end = (start + self.segments_per_cycle).min(segments.len());
        &segments[start..end]
    }
}

/// 0..1 activity of a window: `clamp((mean avg_acc - 1) * 2, 0, 1)`.
pub fn mutation_intensity(window: &[Segment]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let mean = window.iter().map(|s| s.avg_acc).sum::<f64>() / window.len() as f64;
    ((mean - 1.0) * 2.0).clamp(0.0, 1.0)
}

/// Derive one repetition of the seed for its data window.
///
/// Mutations apply in a fixed order: transpose, substitute, omit, dynamics,
/// ornaments. Repetition 0 is never transposed so the motif is first heard
/// as generated.
pub fn mutate_repetition<R: Rng + ?Sized>(
    seed: &Phrase,
    scale: &Scale,
    window: &[Segment],
    repetition: usize,
    rng: &mut R,
) -> Phrase {
    let intensity = mutation_intensity(window);
    let fidgets: u64 = window.iter().map(|s| s.fidgets as u64).sum();
    let mut phrase = seed.clone();

    if repetition > 0 && rng.gen_bool(clamp_probability(intensity * 0.4)) {
        let magnitude = rng.gen_range(1..=3);
        let degrees = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
        phrase = transpose_in_scale(&phrase, scale, degrees);
    }

    if intensity > 0.2 {
        phrase = substitute_notes(&phrase, scale, intensity * 0.3, rng);
    }

    let calmness = 1.0 - intensity;
    if calmness > 0.3 {
        phrase = omit_notes(&phrase, calmness * 0.3, rng);
    }

    phrase = apply_dynamics(&phrase, 0.6 + intensity * 0.6);

    if fidgets > 0 {
        let chance = (fidgets as f64 * 0.08).min(0.4);
        phrase = add_ornaments(&phrase, scale, chance, rng);
    }

    phrase
}

/// Build a dyad or triad biased by `tendency`.
pub fn select_chord<R: Rng + ?Sized>(scale: &Scale, tendency: f64, rng: &mut R) -> Vec<Pitch> {
    let span = scale.len().saturating_sub(3) as f64;
    let base = ((tendency.clamp(-1.0, 1.0) + 1.0) / 2.0 * span).floor() as usize;
    let mut degrees = vec![base, base + 2];
    if rng.gen_bool(0.5) {
        degrees.push(if base + 4 < scale.len() { base + 4 } else { base + 1 });
    }
    let mut pitches: Vec<Pitch> = degrees.into_iter().map(|d| scale.pitch(d)).collect();
    pitches.dedup();
    pitches
}

/// Lays a segment set out as a scheduled piece
#[derive(Debug, Clone)]
pub struct CompositionScheduler {
    scale: Scale,
    bass_scale: Scale,
    tempo: f64,
    seconds_per_segment: f64,
}

impl CompositionScheduler {
    pub fn new(scale: Scale, bass_scale: Scale, tempo: f64, seconds_per_segment: f64) -> Self {
        let seconds_per_segment = if seconds_per_segment.is_finite() && seconds_per_segment > 0.0 {
            seconds_per_segment
        } else {
            1.0
        };
        Self {
            scale,
            bass_scale,
            tempo: super::clamp_tempo(tempo),
            seconds_per_segment,
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn seconds_per_segment(&self) -> f64 {
        self.seconds_per_segment
    }

    /// Schedule the whole piece using the thread-local RNG.
    pub fn schedule<S: Scheduler + ?Sized>(
        &self,
        segments: &SegmentSet,
        scheduler: &S,
    ) -> Vec<EventHandle> {
        self.schedule_with_rng(segments, scheduler, &mut rand::thread_rng())
    }

    pub fn schedule_with_rng<S: Scheduler + ?Sized, R: Rng + ?Sized>(
        &self,
        segments: &SegmentSet,
        scheduler: &S,
        rng: &mut R,
    ) -> Vec<EventHandle> {
        let seed = generate_seed_with_rng(segments, &self.scale, self.tempo, rng);
        let layout = CompositionLayout::new(
            segments.len(),
            self.seconds_per_segment,
            seed.duration(),
        );

        tracing::debug!(
            repetitions = layout.repetitions,
            segments_per_cycle = layout.segments_per_cycle,
            total_duration = layout.total_duration,
            phrase_duration = layout.phrase_duration,
            "[Composition] layout computed"
        );

        let mut handles = Vec::new();
        let lead = self.schedule_lead(segments, &seed, &layout, scheduler, rng, &mut handles);
        let bass = self.schedule_bass(&layout, scheduler, rng, &mut handles);
        let pads = self.schedule_pads(segments, &layout, scheduler, rng, &mut handles);
        let percussion = self.schedule_percussion(segments, scheduler, rng, &mut handles);

        tracing::info!(
            lead,
            bass,
            pads,
            percussion,
            total = handles.len(),
            "[Composition] scheduled piece"
        );
        handles
    }

    fn schedule_lead<S: Scheduler + ?Sized, R: Rng + ?Sized>(
        &self,
        segments: &[Segment],
        seed: &Phrase,
        layout: &CompositionLayout,
        scheduler: &S,
        rng: &mut R,
        handles: &mut Vec<EventHandle>,
    ) -> usize {
        let before = handles.len();
        for repetition in 0..layout.repetitions {
            let window = layout.window(segments, repetition);
            if window.is_empty() {
                continue;
            }

            let phrase = mutate_repetition(seed, &self.scale, window, repetition, rng);
            let phrase_start = repetition as f64 * layout.phrase_duration;
            for note in phrase.notes() {
                let time = phrase_start + note.offset;
                if time >= layout.total_duration {
                    continue;
                }
                let Some(degree) = note.degree else { continue };
                handles.push(scheduler.schedule_at(
                    time,
                    MusicEvent::Lead {
                        pitch: self.scale.pitch(degree),
                        duration: note.duration,
                        velocity: note.velocity,
                    },
                ));
            }
        }
        handles.len() - before
    }

    fn schedule_bass<S: Scheduler + ?Sized, R: Rng + ?Sized>(
        &self,
        layout: &CompositionLayout,
        scheduler: &S,
        rng: &mut R,
        handles: &mut Vec<EventHandle>,
    ) -> usize {
        let before = handles.len();
        let mut repetition = 0;
        while repetition < layout.repetitions {
            let time = repetition as f64 * layout.phrase_duration;
            if time >= layout.total_duration {
                break;
            }
            let hold_reps = BASS_MAX_HOLD_REPS.min(layout.repetitions - repetition);
            let duration =
                (hold_reps as f64 * layout.phrase_duration).min(layout.total_duration - time);
            let root = self.bass_scale.pitch(rng.gen_range(0..self.bass_scale.len()));

            handles.push(scheduler.schedule_at(
                time,
                MusicEvent::Bass {
                    pitch: root,
                    duration,
                    velocity: BASS_VELOCITY,
                },
            ));
            repetition += rng.gen_range(BASS_CHANGE_MIN_REPS..=BASS_CHANGE_MAX_REPS);
        }
        handles.len() - before
    }

    fn schedule_pads<S: Scheduler + ?Sized, R: Rng + ?Sized>(
        &self,
        segments: &[Segment],
        layout: &CompositionLayout,
        scheduler: &S,
        rng: &mut R,
        handles: &mut Vec<EventHandle>,
    ) -> usize {
        let before = handles.len();
        let mut index = 0;
        while index < segments.len() {
            let params = map_to_params(&segments[index]);
            let time = index as f64 * self.seconds_per_segment;
            let duration = (self.seconds_per_segment * PAD_HOLD_SEGMENTS)
                .min(layout.total_duration - time);
            let velocity = (0.2 + (params.loudness_db + 24.0) / 60.0).clamp(0.1, 0.5);

            handles.push(scheduler.schedule_at(
                time,
                MusicEvent::Pad {
                    pitches: select_chord(&self.scale, params.pitch_tendency, rng),
                    duration,
                    velocity,
                },
            ));
            index += rng.gen_range(PAD_MIN_GAP_SEGMENTS..=PAD_MAX_GAP_SEGMENTS);
        }
        handles.len() - before
    }

    fn schedule_percussion<S: Scheduler + ?Sized, R: Rng + ?Sized>(
        &self,
        segments: &[Segment],
        scheduler: &S,
        rng: &mut R,
        handles: &mut Vec<EventHandle>,
    ) -> usize {
        let before = handles.len();
        let sps = self.seconds_per_segment;
        for (index, segment) in segments.iter().enumerate() {
            let params = map_to_params(segment);
            let start = index as f64 * sps;

            if params.density >= 2 && rng.gen_bool(LOW_STRIKE_CHANCE) {
                handles.push(scheduler.schedule_at(
                    start,
                    MusicEvent::Percussion {
                        kind: PercussionKind::LowStrike,
                        velocity: 0.3,
                    },
                ));
            }

            if params.density >= 3 && rng.gen_bool(TICK_CHANCE) {
                handles.push(scheduler.schedule_at(
                    start + sps * 0.25,
                    MusicEvent::Percussion {
                        kind: PercussionKind::Tick,
                        velocity: 0.2,
                    },
                ));
            }

            if params.density >= 2 && rng.gen_bool(params.ornament_probability * 0.5) {
                handles.push(scheduler.schedule_at(
                    start + sps * 0.5,
                    MusicEvent::Percussion {
                        kind: PercussionKind::MetalAccent,
                        velocity: 0.25,
                    },
                ));
            }
        }
        handles.len() - before
    }
}

/// Schedule a full piece in one call.
pub fn schedule_composition<S: Scheduler + ?Sized>(
    segments: &SegmentSet,
    scale: &Scale,
    bass_scale: &Scale,
    tempo: f64,
    seconds_per_segment: f64,
    scheduler: &S,
) -> Vec<EventHandle> {
    CompositionScheduler::new(scale.clone(), bass_scale.clone(), tempo, seconds_per_segment)
        .schedule(segments, scheduler)
}
