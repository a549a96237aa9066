use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::music::{EventHandle, MusicEvent, PercussionKind, Pitch, Scheduler};
use crate::voice::{Voice, VoiceBank};

use super::super::modulation::ModTarget;
use super::Instrument;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scheduler that only records what it is given.
///
/// Used for offline composition (CLI `compose`) and scheduling tests.
#[derive(Default)]
pub struct RecordingScheduler {
    events: Mutex<Vec<(f64, MusicEvent)>>,
    next_id: AtomicU64,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in submission order.
    pub fn events(&self) -> Vec<(f64, MusicEvent)> {
        guard(&self.events).clone()
    }

    /// Recorded events sorted by time.
    pub fn timeline(&self) -> Vec<(f64, MusicEvent)> {
        let mut events = self.events();
        events.sort_by(|a, b| a.0.total_cmp(&b.0));
        events
    }

    pub fn len(&self) -> usize {
        guard(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_at(&self, time: f64, event: MusicEvent) -> EventHandle {
        guard(&self.events).push((time, event));
        EventHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// One call made on a [`RecordingInstrument`]
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentCall {
    Note {
        voice: Voice,
        pitch: Pitch,
        duration: f64,
        time: f64,
        velocity: f64,
    },
    Percussion {
        kind: PercussionKind,
        time: f64,
        velocity: f64,
    },
    ReleaseAll,
    Param {
        target: ModTarget,
        value: f64,
    },
    VoiceGain {
        voice: Voice,
        gain_db: f64,
    },
    MasterGain {
        gain: f64,
    },
    ConfigureVoices,
}

/// Instrument double that records every call.
#[derive(Default)]
pub struct RecordingInstrument {
    calls: Mutex<Vec<InstrumentCall>>,
    params: Mutex<HashMap<ModTarget, f64>>,
}

impl RecordingInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<InstrumentCall> {
        guard(&self.calls).clone()
    }

    /// Triggered notes and percussion hits
    pub fn triggers(&self) -> Vec<InstrumentCall> {
        guard(&self.calls)
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    InstrumentCall::Note { .. } | InstrumentCall::Percussion { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// Last value written to `target`
    pub fn param(&self, target: ModTarget) -> Option<f64> {
        guard(&self.params).get(&target).copied()
    }

    /// Last gain pushed for `voice`
    pub fn voice_gain(&self, voice: Voice) -> Option<f64> {
        guard(&self.calls).iter().rev().find_map(|call| match call {
            InstrumentCall::VoiceGain { voice: v, gain_db } if *v == voice => Some(*gain_db),
            _ => None,
        })
    }

    fn record(&self, call: InstrumentCall) {
        guard(&self.calls).push(call);
    }
}

impl Instrument for RecordingInstrument {
    fn trigger_note(&self, voice: Voice, pitch: Pitch, duration: f64, time: f64, velocity: f64) {
        self.record(InstrumentCall::Note {
            voice,
            pitch,
            duration,
            time,
            velocity,
        });
    }

    fn trigger_percussion(&self, kind: PercussionKind, time: f64, velocity: f64) {
        self.record(InstrumentCall::Percussion {
            kind,
            time,
            velocity,
        });
    }

    fn release_all(&self) {
        self.record(InstrumentCall::ReleaseAll);
    }

    fn set_param(&self, target: ModTarget, value: f64) {
        guard(&self.params).insert(target, value);
        self.record(InstrumentCall::Param { target, value });
    }

    fn set_voice_gain(&self, voice: Voice, gain_db: f64) {
        self.record(InstrumentCall::VoiceGain { voice, gain_db });
    }

    fn set_master_gain(&self, gain: f64) {
        self.record(InstrumentCall::MasterGain { gain });
    }

    fn configure_voices(&self, _voices: &VoiceBank) {
        self.record(InstrumentCall::ConfigureVoices);
    }
}
