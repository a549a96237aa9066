//! Pitches, scales and the named scale presets.
//!
//! All scales are pentatonic-leaning lists of concrete pitches in ascending
//! order. Melodic code never works with pitches directly; it works with
//! indices ("degrees") into a [`Scale`] so every mutation stays in key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A concrete pitch as a MIDI note number (C4 = 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch(u8);

impl Pitch {
    pub const fn from_midi(note: u8) -> Self {
        Self(note)
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    /// Equal-tempered frequency with A4 = 440 Hz.
    pub fn frequency_hz(self) -> f64 {
        440.0 * 2f64.powf((self.0 as f64 - 69.0) / 12.0)
    }

    /// One octave down, saturating at MIDI 0.
    pub fn octave_down(self) -> Self {
        Self(self.0.saturating_sub(12))
    }
}

impl FromStr for Pitch {
    type Err = String;

    /// Parse scientific pitch notation such as `C4`, `F#3` or `Bb2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| "empty pitch name".to_string())?
            .to_ascii_uppercase();
        let base: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => return Err(format!("invalid note letter '{}'", other)),
        };

        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };
        let octave: i32 = octave_str
            .parse()
            .map_err(|_| format!("invalid octave in '{}'", s))?;

        let midi = (octave + 1) * 12 + base + accidental;
        u8::try_from(midi)
            .ok()
            .filter(|m| *m <= 127)
            .map(Pitch)
            .ok_or_else(|| format!("pitch '{}' out of MIDI range", s))
    }
}

impl TryFrom<String> for Pitch {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(p: Pitch) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let octave = self.0 as i32 / 12 - 1;
        write!(f, "{}{}", NOTE_NAMES[(self.0 % 12) as usize], octave)
    }
}

/// Ordered, non-empty list of pitches, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Pitch>", into = "Vec<Pitch>")]
pub struct Scale {
    pitches: Vec<Pitch>,
}

impl Scale {
    /// Build a scale; pitches are sorted ascending. `None` if empty.
    pub fn new(mut pitches: Vec<Pitch>) -> Option<Self> {
        if pitches.is_empty() {
            return None;
        }
        pitches.sort();
        Some(Self { pitches })
    }

    pub fn from_preset(preset: ScalePreset) -> Self {
        Self::from_names(preset.pitch_names())
    }

    /// Low-register scale used for bass roots.
    pub fn bass() -> Self {
        Self::from_names(&["C2", "D2", "E2", "G2", "A2", "C3"])
    }

    fn from_names(names: &[&str]) -> Self {
        let pitches = names
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        // Preset tables are static and non-empty.
        Self { pitches }
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn highest_degree(&self) -> usize {
        self.pitches.len() - 1
    }

    /// Clamp a signed degree into `[0, len - 1]`.
    pub fn clamp_degree(&self, degree: i64) -> usize {
        degree.clamp(0, self.highest_degree() as i64) as usize
    }

    /// Pitch at `degree`, clamped to the top of the scale.
    pub fn pitch(&self, degree: usize) -> Pitch {
        self.pitches[degree.min(self.highest_degree())]
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }
}

impl TryFrom<Vec<Pitch>> for Scale {
    type Error = String;

    fn try_from(value: Vec<Pitch>) -> Result<Self, Self::Error> {
        Scale::new(value).ok_or_else(|| "scale must contain at least one pitch".to_string())
    }
}

impl From<Scale> for Vec<Pitch> {
    fn from(scale: Scale) -> Self {
        scale.pitches
    }
}

/// Named scale presets selectable from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalePreset {
    #[default]
    Ambient,
    Major,
    Minor,
}

impl ScalePreset {
    pub const ALL: [ScalePreset; 3] = [ScalePreset::Ambient, ScalePreset::Major, ScalePreset::Minor];

    pub fn name(&self) -> &'static str {
        match self {
            ScalePreset::Ambient => "ambient",
            ScalePreset::Major => "major",
            ScalePreset::Minor => "minor",
        }
    }

    fn pitch_names(&self) -> &'static [&'static str] {
        match self {
            ScalePreset::Major => &["C4", "D4", "E4", "G4", "A4", "C5", "D5", "E5"],
            ScalePreset::Minor => &["A3", "C4", "D4", "E4", "G4", "A4", "C5", "D5"],
            ScalePreset::Ambient => &["C3", "G3", "C4", "E4", "G4", "B4", "C5", "E5"],
        }
    }
}

impl FromStr for ScalePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalePreset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownScale {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for ScalePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
