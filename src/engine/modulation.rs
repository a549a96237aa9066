//! Low-frequency modulation.
//!
//! Two free-running LFO slots, each optionally bound to one instrument
//! parameter. The waveform is a sum of two sines whose frequency ratio is the
//! golden ratio, so the sweep never settles into an audible loop:
//!
//! `w(t) = 0.7 * sin(2*pi*f*t) + 0.3 * sin(2*pi*f*1.618*t + phase)`
//!
//! A parameter's modulated value is `base + w(t) * depth * swing`, clamped
//! to the parameter's range. Every parameter touched during a session is
//! remembered and written back to its base value on [`Modulator::reset`].

use std::collections::BTreeSet;
use std::f64::consts::TAU;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::backend::Instrument;
use crate::config::{LfoSlotConfig, ModulationConfig};
use crate::error::ConfigError;
use crate::voice::VoiceBank;

/// Number of LFO slots
pub const LFO_SLOTS: usize = 2;

const PRIMARY_WEIGHT: f64 = 0.7;
const SECONDARY_WEIGHT: f64 = 0.3;
const SECONDARY_RATIO: f64 = 1.618;

/// Instrument parameters an LFO can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModTarget {
    LeadFilterCutoff,
    LeadHarmonicity,
    LeadModulationIndex,
    LeadReverbSend,
    LeadDelaySend,
    PadDetune,
}

impl ModTarget {
    pub const ALL: [ModTarget; 6] = [
        ModTarget::LeadFilterCutoff,
        ModTarget::LeadHarmonicity,
        ModTarget::LeadModulationIndex,
        ModTarget::LeadReverbSend,
        ModTarget::LeadDelaySend,
        ModTarget::PadDetune,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModTarget::LeadFilterCutoff => "lead_filter_cutoff",
            ModTarget::LeadHarmonicity => "lead_harmonicity",
            ModTarget::LeadModulationIndex => "lead_modulation_index",
            ModTarget::LeadReverbSend => "lead_reverb_send",
            ModTarget::LeadDelaySend => "lead_delay_send",
            ModTarget::PadDetune => "pad_detune",
        }
    }

    /// Valid range of the parameter
    pub fn range(self) -> RangeInclusive<f64> {
        match self {
            ModTarget::LeadFilterCutoff => 200.0..=6000.0,
            ModTarget::LeadHarmonicity => 0.5..=4.0,
            ModTarget::LeadModulationIndex => 0.0..=10.0,
            ModTarget::LeadReverbSend | ModTarget::LeadDelaySend => 0.0..=1.0,
            ModTarget::PadDetune => -30.0..=30.0,
        }
    }

    /// Excursion at full depth, either side of the base value
    pub fn swing(self) -> f64 {
        match self {
            ModTarget::LeadFilterCutoff => 1500.0,
            ModTarget::LeadHarmonicity => 1.0,
            ModTarget::LeadModulationIndex => 3.0,
            ModTarget::LeadReverbSend | ModTarget::LeadDelaySend => 0.25,
            ModTarget::PadDetune => 20.0,
        }
    }

    /// Unmodulated value, read from the voice configuration
    pub fn base_value(self, voices: &VoiceBank) -> f64 {
        let base = match self {
            ModTarget::LeadFilterCutoff => voices.lead.filter_cutoff_hz,
            ModTarget::LeadHarmonicity => voices.lead.harmonicity,
            ModTarget::LeadModulationIndex => voices.lead.modulation_index,
            ModTarget::LeadReverbSend => voices.lead.reverb_send,
            ModTarget::LeadDelaySend => voices.lead.delay_send,
            ModTarget::PadDetune => voices.pad.detune_cents,
        };
        let range = self.range();
        base.clamp(*range.start(), *range.end())
    }

    /// Base value offset by `wave * depth * swing`, clamped to range.
    pub fn modulated_value(self, voices: &VoiceBank, wave: f64, depth: f64) -> f64 {
        let range = self.range();
        (self.base_value(voices) + wave * depth * self.swing()).clamp(*range.start(), *range.end())
    }
}

impl fmt::Display for ModTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModTarget::ALL
            .into_iter()
            .find(|target| target.name() == s.trim())
            .ok_or_else(|| ConfigError::Parse {
                details: format!("unknown modulation target '{}'", s),
            })
    }
}

/// Composite LFO waveform in [-1, 1].
pub fn lfo_wave(rate_hz: f64, t: f64, phase: f64) -> f64 {
    PRIMARY_WEIGHT * (TAU * rate_hz * t).sin()
        + SECONDARY_WEIGHT * (TAU * rate_hz * SECONDARY_RATIO * t + phase).sin()
}

/// Per-session LFO state
#[derive(Debug, Clone, Default)]
pub struct Modulator {
    phases: [f64; LFO_SLOTS],
    touched: BTreeSet<ModTarget>,
}

impl Modulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session with fresh secondary phases.
    pub fn begin(&mut self, phases: [f64; LFO_SLOTS]) {
        self.phases = phases;
        self.touched.clear();
    }

    /// Targets written since the last reset
    pub fn touched(&self) -> impl Iterator<Item = ModTarget> + '_ {
        self.touched.iter().copied()
    }

    /// Push the modulated value of every bound slot at time `t` (seconds
    /// since the session started).
    pub fn tick(
        &mut self,
        t: f64,
        config: &ModulationConfig,
        voices: &VoiceBank,
        instrument: &dyn Instrument,
    ) {
        for (slot, phase) in config.slots.iter().zip(self.phases) {
            let Some(target) = slot.target else { continue };
            let wave = lfo_wave(slot.rate_hz, t, phase);
            let value = target.modulated_value(voices, wave, slot.depth);
            instrument.set_param(target, value);
            self.touched.insert(target);
        }
    }

    /// Restore `target` to its base value if it is no longer bound to any
    /// slot. Used when a slot is re-pointed mid-session.
    pub fn release(
        &mut self,
        target: ModTarget,
        config: &ModulationConfig,
        voices: &VoiceBank,
        instrument: &dyn Instrument,
    ) {
        let still_bound = config.slots.iter().any(|slot| slot.target == Some(target));
        if !still_bound && self.touched.remove(&target) {
            instrument.set_param(target, target.base_value(voices));
        }
    }

    /// Write every touched parameter back to its base value.
    pub fn reset(&mut self, voices: &VoiceBank, instrument: &dyn Instrument) {
        for target in std::mem::take(&mut self.touched) {
            let base = target.base_value(voices);
            instrument.set_param(target, base);
            tracing::debug!(param = %target, base, "[Modulation] reset to base");
        }
    }
}

/// Clamp an LFO rate into 0.01..=2 Hz.
pub fn clamp_rate(rate_hz: f64) -> f64 {
    if rate_hz.is_finite() {
        rate_hz.clamp(0.01, 2.0)
    } else {
        LfoSlotConfig::default().rate_hz
    }
}

/// Clamp an LFO depth into 0..=1.
pub fn clamp_depth(depth: f64) -> f64 {
    if depth.is_finite() {
        depth.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
