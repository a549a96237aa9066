//! Engine module housing playback.
//!
//! `backend` holds the instrument and transport traits with their tokio and
//! recording implementations, `modulation` the LFO layer, and `core` the
//! `PlaybackController` that ties them to the composition pass.

pub mod backend;
pub mod core;
pub mod modulation;

pub use backend::{
    Instrument, InstrumentCall, RecordingInstrument, RecordingScheduler, SystemTimeSource,
    TimeSource, TokioTransport, Transport,
};
pub use self::core::{PlaybackController, PlaybackEvent, PlaybackState, SessionPlan};
pub use modulation::{lfo_wave, ModTarget, Modulator, LFO_SLOTS};
