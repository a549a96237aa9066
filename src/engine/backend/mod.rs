//! Backend abstractions for the playback engine.
//!
//! The engine never synthesises sound or keeps musical time itself. It talks
//! to an [`Instrument`] that turns triggers into sound and a [`Transport`]
//! that fires scheduled events at the right moment. Both are traits so the
//! controller can run against recording doubles in tests and the CLI.

use tokio::time::Instant;

use crate::error::PlaybackError;
use crate::music::{EventHandle, PercussionKind, Pitch, Scheduler};
use crate::voice::{Voice, VoiceBank};

use super::modulation::ModTarget;

/// Sound-producing side of the engine.
///
/// Times are transport seconds. Implementations must be cheap to call; the
/// transport invokes `trigger_*` from its worker task.
pub trait Instrument: Send + Sync {
    fn trigger_note(&self, voice: Voice, pitch: Pitch, duration: f64, time: f64, velocity: f64);
    fn trigger_percussion(&self, kind: PercussionKind, time: f64, velocity: f64);
    /// Release every sustaining note on every voice.
    fn release_all(&self);
    fn set_param(&self, target: ModTarget, value: f64);
    fn set_voice_gain(&self, voice: Voice, gain_db: f64);
    fn set_master_gain(&self, gain: f64);
    fn configure_voices(&self, voices: &VoiceBank);
}

/// Musical clock that fires scheduled events.
pub trait Transport: Scheduler + Send + Sync {
    /// Start the clock from position zero. No-op if already running.
    fn start(&self) -> Result<(), PlaybackError>;
    /// Halt the clock and reset its position. Scheduled events are kept.
    fn stop(&self);
    /// Remove a scheduled event; `false` if it already fired or was unknown.
    fn cancel(&self, handle: EventHandle) -> bool;
    /// Seconds since `start`, 0 while stopped.
    fn now(&self) -> f64;
    /// Events still waiting to fire
    fn pending(&self) -> usize;
}

/// Trait representing a monotonic time source.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by tokio's clock, which follows virtual time
/// when the runtime is paused.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

mod recording;
mod transport;

pub use recording::{InstrumentCall, RecordingInstrument, RecordingScheduler};
pub use transport::TokioTransport;
