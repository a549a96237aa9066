//! Phrase data model.
//!
//! A [`Phrase`] is an immutable value: mutators in [`super::mutate`] always
//! build a new phrase and never touch their input.

use serde::{Deserialize, Serialize};

/// One slot of a phrase: a note on a scale degree, or a rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteSlot {
    /// Index into the active scale; `None` is a rest
    pub degree: Option<usize>,
    /// Sounding length in seconds
    pub duration: f64,
    /// 0.0-1.0
    pub velocity: f64,
    /// Seconds from the start of the phrase
    pub offset: f64,
}

impl NoteSlot {
    pub fn note(degree: usize, duration: f64, velocity: f64, offset: f64) -> Self {
        Self {
            degree: Some(degree),
            duration,
            velocity: velocity.clamp(0.0, 1.0),
            offset,
        }
    }

    pub fn rest(duration: f64, offset: f64) -> Self {
        Self {
            degree: None,
            duration,
            velocity: 0.0,
            offset,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.degree.is_none()
    }

    /// Same timing, silenced.
    pub fn silenced(&self) -> Self {
        Self::rest(self.duration, self.offset)
    }
}

/// Ordered note slots plus the phrase's total length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    slots: Vec<NoteSlot>,
    duration: f64,
}

impl Phrase {
    pub fn new(slots: Vec<NoteSlot>, duration: f64) -> Self {
        Self { slots, duration }
    }

    /// Same length, new slots.
    pub fn with_slots(&self, slots: Vec<NoteSlot>) -> Self {
        Self::new(slots, self.duration)
    }

    pub fn slots(&self) -> &[NoteSlot] {
        &self.slots
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots that actually sound.
    pub fn notes(&self) -> impl Iterator<Item = &NoteSlot> {
        self.slots.iter().filter(|slot| !slot.is_rest())
    }

    pub fn is_silent(&self) -> bool {
        self.notes().next().is_none()
    }
}
