//! Voice configuration
//!
//! Every instrument voice has its own strongly typed config struct. Defaults
//! come from [`VoiceBank::factory`]; anything loaded from outside goes
//! through `sanitize`, which clamps field by field and reports what it had to
//! change.

pub mod mix;
pub mod presets;

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use mix::VoiceMix;
pub use presets::{apply_preset, cycle_preset, BodyPart, PresetCursor, PRESET_STATES};

/// Instrument layers the composition triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Lead,
    Pad,
    Bass,
    Percussion,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Lead, Voice::Pad, Voice::Bass, Voice::Percussion];

    pub fn name(self) -> &'static str {
        match self {
            Voice::Lead => "lead",
            Voice::Pad => "pad",
            Voice::Bass => "bass",
            Voice::Percussion => "percussion",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lead" | "pluck" => Ok(Voice::Lead),
            "pad" => Ok(Voice::Pad),
            "bass" => Ok(Voice::Bass),
            "percussion" | "perc" => Ok(Voice::Percussion),
            other => Err(ConfigError::Parse {
                details: format!("unknown voice '{}'", other),
            }),
        }
    }
}

/// Oscillator shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::Square,
    ];
}

/// ADSR envelope, times in seconds, sustain as a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Envelope {
    pub const ATTACK_RANGE: RangeInclusive<f64> = 0.001..=4.0;
    pub const DECAY_RANGE: RangeInclusive<f64> = 0.01..=4.0;
    pub const SUSTAIN_RANGE: RangeInclusive<f64> = 0.0..=1.0;
    pub const RELEASE_RANGE: RangeInclusive<f64> = 0.05..=8.0;

    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    fn sanitize(&mut self, prefix: &str, defaults: &Envelope, clamped: &mut Vec<String>) {
        clamp_field(clamped, &format!("{}.attack", prefix), &mut self.attack, Self::ATTACK_RANGE, defaults.attack);
        clamp_field(clamped, &format!("{}.decay", prefix), &mut self.decay, Self::DECAY_RANGE, defaults.decay);
        clamp_field(clamped, &format!("{}.sustain", prefix), &mut self.sustain, Self::SUSTAIN_RANGE, defaults.sustain);
        clamp_field(clamped, &format!("{}.release", prefix), &mut self.release, Self::RELEASE_RANGE, defaults.release);
    }
}

/// Clamp `value` into `range`, recording `field` if it moved.
/// Non-finite values are replaced by `fallback`.
fn clamp_field(
    clamped: &mut Vec<String>,
    field: &str,
    value: &mut f64,
    range: RangeInclusive<f64>,
    fallback: f64,
) {
    let original = *value;
    let fixed = if original.is_finite() {
        original.clamp(*range.start(), *range.end())
    } else {
        fallback
    };
    if fixed != original {
        *value = fixed;
        clamped.push(field.to_string());
    }
}

/// FM lead voice, the one shaped by the body-part presets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadVoiceConfig {
    pub oscillator: Waveform,
    pub modulation: Waveform,
    /// Glide time in seconds
    pub portamento: f64,
    /// Voice level 0..1, independent of the mixer
    pub volume: f64,
    pub harmonicity: f64,
    pub modulation_index: f64,
    pub envelope: Envelope,
    pub filter_cutoff_hz: f64,
    pub reverb_send: f64,
    pub delay_send: f64,
}

impl LeadVoiceConfig {
    pub const PORTAMENTO_RANGE: RangeInclusive<f64> = 0.0..=0.5;
    pub const VOLUME_RANGE: RangeInclusive<f64> = 0.0..=1.0;
    pub const HARMONICITY_RANGE: RangeInclusive<f64> = 0.25..=8.0;
    pub const MODULATION_INDEX_RANGE: RangeInclusive<f64> = 0.0..=20.0;
    pub const FILTER_CUTOFF_RANGE: RangeInclusive<f64> = 100.0..=8000.0;
    pub const SEND_RANGE: RangeInclusive<f64> = 0.0..=1.0;

    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut clamped = Vec::new();
        clamp_field(&mut clamped, "lead.portamento", &mut self.portamento, Self::PORTAMENTO_RANGE, defaults.portamento);
        clamp_field(&mut clamped, "lead.volume", &mut self.volume, Self::VOLUME_RANGE, defaults.volume);
        clamp_field(&mut clamped, "lead.harmonicity", &mut self.harmonicity, Self::HARMONICITY_RANGE, defaults.harmonicity);
        clamp_field(
            &mut clamped,
            "lead.modulation_index",
            &mut self.modulation_index,
            Self::MODULATION_INDEX_RANGE,
            defaults.modulation_index,
        );
        self.envelope.sanitize("lead.envelope", &defaults.envelope, &mut clamped);
        clamp_field(
            &mut clamped,
            "lead.filter_cutoff_hz",
            &mut self.filter_cutoff_hz,
            Self::FILTER_CUTOFF_RANGE,
            defaults.filter_cutoff_hz,
        );
        clamp_field(&mut clamped, "lead.reverb_send", &mut self.reverb_send, Self::SEND_RANGE, defaults.reverb_send);
        clamp_field(&mut clamped, "lead.delay_send", &mut self.delay_send, Self::SEND_RANGE, defaults.delay_send);
        clamped
    }
}

impl Default for LeadVoiceConfig {
    fn default() -> Self {
        Self {
            oscillator: Waveform::Triangle,
            modulation: Waveform::Triangle,
            portamento: 0.04,
            volume: 0.8,
            harmonicity: 1.5,
            modulation_index: 3.0,
            envelope: Envelope::new(0.02, 0.15, 0.3, 0.8),
            filter_cutoff_hz: 2000.0,
            reverb_send: 0.5,
            delay_send: 0.2,
        }
    }
}

/// Sustained background pad
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadVoiceConfig {
    pub oscillator: Waveform,
    pub envelope: Envelope,
    pub detune_cents: f64,
}

impl PadVoiceConfig {
    pub const DETUNE_RANGE: RangeInclusive<f64> = -50.0..=50.0;

    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut clamped = Vec::new();
        self.envelope.sanitize("pad.envelope", &defaults.envelope, &mut clamped);
        clamp_field(&mut clamped, "pad.detune_cents", &mut self.detune_cents, Self::DETUNE_RANGE, defaults.detune_cents);
        clamped
    }
}

impl Default for PadVoiceConfig {
    fn default() -> Self {
        Self {
            oscillator: Waveform::Sine,
            envelope: Envelope::new(2.0, 1.0, 0.8, 4.0),
            detune_cents: 0.0,
        }
    }
}

/// Low register root notes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BassVoiceConfig {
    pub oscillator: Waveform,
    pub envelope: Envelope,
    pub filter_cutoff_hz: f64,
}

impl BassVoiceConfig {
    pub const FILTER_CUTOFF_RANGE: RangeInclusive<f64> = 40.0..=2000.0;

    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut clamped = Vec::new();
        self.envelope.sanitize("bass.envelope", &defaults.envelope, &mut clamped);
        clamp_field(
            &mut clamped,
            "bass.filter_cutoff_hz",
            &mut self.filter_cutoff_hz,
            Self::FILTER_CUTOFF_RANGE,
            defaults.filter_cutoff_hz,
        );
        clamped
    }
}

impl Default for BassVoiceConfig {
    fn default() -> Self {
        Self {
            oscillator: Waveform::Sine,
            envelope: Envelope::new(0.5, 1.0, 0.7, 3.0),
            filter_cutoff_hz: 400.0,
        }
    }
}

/// Membrane style percussion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercussionVoiceConfig {
    pub pitch_decay: f64,
    pub octaves: f64,
    pub envelope: Envelope,
}

impl PercussionVoiceConfig {
    pub const PITCH_DECAY_RANGE: RangeInclusive<f64> = 0.0..=0.5;
    pub const OCTAVES_RANGE: RangeInclusive<f64> = 0.5..=8.0;

    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut clamped = Vec::new();
        clamp_field(
            &mut clamped,
            "percussion.pitch_decay",
            &mut self.pitch_decay,
            Self::PITCH_DECAY_RANGE,
            defaults.pitch_decay,
        );
        clamp_field(&mut clamped, "percussion.octaves", &mut self.octaves, Self::OCTAVES_RANGE, defaults.octaves);
        self.envelope.sanitize("percussion.envelope", &defaults.envelope, &mut clamped);
        clamped
    }
}

impl Default for PercussionVoiceConfig {
    fn default() -> Self {
        Self {
            pitch_decay: 0.1,
            octaves: 2.0,
            envelope: Envelope::new(0.01, 0.8, 0.0, 0.5),
        }
    }
}

/// The full set of voice configurations owned by one engine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceBank {
    pub lead: LeadVoiceConfig,
    pub pad: PadVoiceConfig,
    pub bass: BassVoiceConfig,
    pub percussion: PercussionVoiceConfig,
}

impl VoiceBank {
    /// Factory defaults
    pub fn factory() -> Self {
        Self::default()
    }

    /// Clamp every field into range; returns the dotted names of fields that
    /// were changed.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut clamped = self.lead.sanitize();
        clamped.extend(self.pad.sanitize());
        clamped.extend(self.bass.sanitize());
        clamped.extend(self.percussion.sanitize());
        clamped
    }

    /// Parse a voice bank from JSON. Missing fields take factory defaults and
    /// out-of-range fields are clamped; the clamped field names are returned
    /// alongside the bank.
    pub fn import_json(json: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut bank: VoiceBank = serde_json::from_str(json)?;
        let clamped = bank.sanitize();
        if !clamped.is_empty() {
            log::warn!("[Voices] Clamped imported fields: {}", clamped.join(", "));
        }
        Ok((bank, clamped))
    }

    pub fn export_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Lead voice parameter groups that can be re-rolled together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSection {
    /// Carrier and modulator waveforms
    Timbre,
    /// Portamento and volume
    Expression,
    /// Harmonicity and modulation index
    Richness,
    /// ADSR
    Articulation,
    /// Reverb and delay sends
    Space,
}

impl LeadSection {
    pub const ALL: [LeadSection; 5] = [
        LeadSection::Timbre,
        LeadSection::Expression,
        LeadSection::Richness,
        LeadSection::Articulation,
        LeadSection::Space,
    ];
}

impl FromStr for LeadSection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timbre" => Ok(LeadSection::Timbre),
            "expression" => Ok(LeadSection::Expression),
            "richness" => Ok(LeadSection::Richness),
            "articulation" => Ok(LeadSection::Articulation),
            "space" => Ok(LeadSection::Space),
            other => Err(ConfigError::Parse {
                details: format!("unknown lead section '{}'", other),
            }),
        }
    }
}

fn roll<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<f64>) -> f64 {
    rng.gen_range(range)
}

/// Re-roll one section of the lead voice within its valid ranges. Other
/// sections are left as they are.
pub fn randomize_section<R: Rng + ?Sized>(
    lead: &mut LeadVoiceConfig,
    section: LeadSection,
    rng: &mut R,
) {
    match section {
        LeadSection::Timbre => {
            lead.oscillator = Waveform::ALL[rng.gen_range(0..Waveform::ALL.len())];
            lead.modulation = Waveform::ALL[rng.gen_range(0..Waveform::ALL.len())];
        }
        LeadSection::Expression => {
            lead.portamento = roll(rng, 0.0..=0.15);
            lead.volume = roll(rng, 0.6..=1.0);
        }
        LeadSection::Richness => {
            lead.harmonicity = roll(rng, 0.5..=4.0);
            lead.modulation_index = roll(rng, 1.0..=8.0);
        }
        LeadSection::Articulation => {
            lead.envelope = Envelope::new(
                roll(rng, 0.005..=0.1),
                roll(rng, 0.05..=0.4),
                roll(rng, 0.1..=0.6),
                roll(rng, 0.3..=2.0),
            );
        }
        LeadSection::Space => {
            lead.reverb_send = roll(rng, 0.3..=0.9);
            lead.delay_send = roll(rng, 0.1..=0.5);
        }
    }
    log::debug!("[Voices] Randomized lead section {:?}", section);
}
