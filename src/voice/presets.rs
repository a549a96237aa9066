// Body-part voice presets
//
// Each of the five parts of the bird picks one of five states, and each state
// sets one section of the lead voice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Envelope, LeadSection, LeadVoiceConfig, Waveform};
use crate::error::ConfigError;

/// States per body part
pub const PRESET_STATES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    Beak,
    Eye,
    Body,
    Wings,
    Tail,
}

impl BodyPart {
    pub const ALL: [BodyPart; 5] = [
        BodyPart::Beak,
        BodyPart::Eye,
        BodyPart::Body,
        BodyPart::Wings,
        BodyPart::Tail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Beak => "beak",
            BodyPart::Eye => "eye",
            BodyPart::Body => "body",
            BodyPart::Wings => "wings",
            BodyPart::Tail => "tail",
        }
    }

    /// The lead voice section this part controls.
    pub fn section(self) -> LeadSection {
        match self {
            BodyPart::Beak => LeadSection::Timbre,
            BodyPart::Eye => LeadSection::Expression,
            BodyPart::Body => LeadSection::Richness,
            BodyPart::Wings => LeadSection::Articulation,
            BodyPart::Tail => LeadSection::Space,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyPart {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyPart::ALL
            .into_iter()
            .find(|part| part.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPreset {
                part: s.to_string(),
                index: 0,
            })
    }
}

// Beak: carrier / modulator waveform
const BEAK: [(Waveform, Waveform); PRESET_STATES] = [
    (Waveform::Sine, Waveform::Sine),
    (Waveform::Triangle, Waveform::Triangle),
    (Waveform::Sawtooth, Waveform::Square),
    (Waveform::Square, Waveform::Sawtooth),
    (Waveform::Triangle, Waveform::Sine),
];

// Eye: portamento / volume
const EYE: [(f64, f64); PRESET_STATES] = [
    (0.0, 0.7),
    (0.04, 0.8),
    (0.08, 0.9),
    (0.12, 1.0),
    (0.15, 0.6),
];

// Body: harmonicity / modulation index
const BODY: [(f64, f64); PRESET_STATES] = [
    (0.5, 1.0),
    (1.5, 3.0),
    (2.5, 5.0),
    (3.5, 7.0),
    (4.0, 8.0),
];

// Wings: attack, decay, sustain, release
const WINGS: [(f64, f64, f64, f64); PRESET_STATES] = [
    (0.005, 0.05, 0.1, 0.3),
    (0.02, 0.15, 0.3, 0.8),
    (0.05, 0.25, 0.5, 1.2),
    (0.08, 0.35, 0.4, 1.8),
    (0.1, 0.4, 0.6, 2.0),
];

// Tail: reverb send / delay send
const TAIL: [(f64, f64); PRESET_STATES] = [
    (0.3, 0.1),
    (0.5, 0.2),
    (0.7, 0.3),
    (0.9, 0.4),
    (0.6, 0.5),
];

/// Write preset `index` of `part` into the lead voice.
pub fn apply_preset(
    lead: &mut LeadVoiceConfig,
    part: BodyPart,
    index: usize,
) -> Result<(), ConfigError> {
    if index >= PRESET_STATES {
        return Err(ConfigError::UnknownPreset {
            part: part.name().to_string(),
            index,
        });
    }

    match part {
        BodyPart::Beak => {
            let (oscillator, modulation) = BEAK[index];
            lead.oscillator = oscillator;
            lead.modulation = modulation;
        }
        BodyPart::Eye => {
            let (portamento, volume) = EYE[index];
            lead.portamento = portamento;
            lead.volume = volume;
        }
        BodyPart::Body => {
            let (harmonicity, modulation_index) = BODY[index];
            lead.harmonicity = harmonicity;
            lead.modulation_index = modulation_index;
        }
        BodyPart::Wings => {
            let (attack, decay, sustain, release) = WINGS[index];
            lead.envelope = Envelope::new(attack, decay, sustain, release);
        }
        BodyPart::Tail => {
            let (reverb_send, delay_send) = TAIL[index];
            lead.reverb_send = reverb_send;
            lead.delay_send = delay_send;
        }
    }

    log::debug!("[Voices] Applied {} preset {}", part, index);
    Ok(())
}

/// Current state index per body part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresetCursor {
    states: [usize; 5],
}

impl PresetCursor {
    pub fn current(&self, part: BodyPart) -> usize {
        self.states[part.index()]
    }

    /// Record that `part` was set to `index` directly.
    pub fn set(&mut self, part: BodyPart, index: usize) {
        self.states[part.index()] = index % PRESET_STATES;
    }

    /// Advance `part` to its next state, wrapping after the last.
    pub fn advance(&mut self, part: BodyPart) -> usize {
        let next = (self.current(part) + 1) % PRESET_STATES;
        self.states[part.index()] = next;
        next
    }
}

/// Advance `part` and apply the state it lands on.
pub fn cycle_preset(cursor: &mut PresetCursor, lead: &mut LeadVoiceConfig, part: BodyPart) -> usize {
    let index = cursor.advance(part);
    // index is always < PRESET_STATES
    let _ = apply_preset(lead, part, index);
    index
}
