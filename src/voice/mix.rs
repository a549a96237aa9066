// Mixer levels and mutes
//
// Volumes are 0..1 slider values. Each voice has a base level in dB; the
// slider moves it by up to 20 dB around the voice's default slider position.

use serde::{Deserialize, Serialize};

use super::Voice;

/// Gain applied to a muted voice
pub const MUTED_DB: f64 = -60.0;

/// dB change per unit of slider travel
const DB_PER_UNIT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLevel {
    pub volume: f64,
    pub muted: bool,
}

/// Master gain plus one channel per voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceMix {
    pub master: f64,
    pub lead: ChannelLevel,
    pub pad: ChannelLevel,
    pub bass: ChannelLevel,
    pub percussion: ChannelLevel,
}

impl Default for ChannelLevel {
    fn default() -> Self {
        Self {
            volume: 0.5,
            muted: false,
        }
    }
}

impl Default for VoiceMix {
    fn default() -> Self {
        Self {
            master: 0.8,
            lead: ChannelLevel::at(default_volume(Voice::Lead)),
            pad: ChannelLevel::at(default_volume(Voice::Pad)),
            bass: ChannelLevel::at(default_volume(Voice::Bass)),
            percussion: ChannelLevel::at(default_volume(Voice::Percussion)),
        }
    }
}

impl ChannelLevel {
    fn at(volume: f64) -> Self {
        Self {
            volume,
            muted: false,
        }
    }
}

/// Base level of a voice in dB
pub fn base_db(voice: Voice) -> f64 {
    match voice {
        Voice::Lead => -8.0,
        Voice::Pad => -12.0,
        Voice::Bass => -14.0,
        Voice::Percussion => -20.0,
    }
}

/// Slider position at which a voice plays at its base level
pub fn default_volume(voice: Voice) -> f64 {
    match voice {
        Voice::Lead => 0.85,
        Voice::Pad => 0.7,
        Voice::Bass => 0.7,
        Voice::Percussion => 0.5,
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

impl VoiceMix {
    fn channel(&self, voice: Voice) -> &ChannelLevel {
        match voice {
            Voice::Lead => &self.lead,
            Voice::Pad => &self.pad,
            Voice::Bass => &self.bass,
            Voice::Percussion => &self.percussion,
        }
    }

    fn channel_mut(&mut self, voice: Voice) -> &mut ChannelLevel {
        match voice {
            Voice::Lead => &mut self.lead,
            Voice::Pad => &mut self.pad,
            Voice::Bass => &mut self.bass,
            Voice::Percussion => &mut self.percussion,
        }
    }

    pub fn set_master(&mut self, value: f64) {
        self.master = clamp_unit(value, self.master);
    }

    pub fn volume(&self, voice: Voice) -> f64 {
        self.channel(voice).volume
    }

    pub fn set_volume(&mut self, voice: Voice, value: f64) {
        let channel = self.channel_mut(voice);
        channel.volume = clamp_unit(value, channel.volume);
    }

    pub fn is_muted(&self, voice: Voice) -> bool {
        self.channel(voice).muted
    }

    pub fn set_mute(&mut self, voice: Voice, muted: bool) {
        self.channel_mut(voice).muted = muted;
    }

    /// Flip the mute flag; returns the new state.
    pub fn toggle_mute(&mut self, voice: Voice) -> bool {
        let channel = self.channel_mut(voice);
        channel.muted = !channel.muted;
        channel.muted
    }

    /// Gain the instrument should apply to `voice`, in dB.
    pub fn effective_gain_db(&self, voice: Voice) -> f64 {
        let channel = self.channel(voice);
        if channel.muted {
            MUTED_DB
        } else {
            base_db(voice) + (channel.volume - default_volume(voice)) * DB_PER_UNIT
        }
    }

    /// Clamp loaded values into range.
    pub fn sanitize(&mut self) {
        self.set_master(self.master);
        for voice in Voice::ALL {
            let volume = self.volume(voice);
            self.channel_mut(voice).volume = clamp_unit(volume, default_volume(voice));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_play_at_base_level() {
        let mix = VoiceMix::default();
        for voice in Voice::ALL {
            assert!((mix.effective_gain_db(voice) - base_db(voice)).abs() < 1e-9);
        }
        assert_eq!(mix.master, 0.8);
    }

    #[test]
    fn test_slider_moves_gain() {
        let mut mix = VoiceMix::default();
        mix.set_volume(Voice::Pad, 0.2);
        assert!((mix.effective_gain_db(Voice::Pad) - (-22.0)).abs() < 1e-9);
        mix.set_volume(Voice::Percussion, 1.0);
        assert!((mix.effective_gain_db(Voice::Percussion) - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_mute_overrides_volume() {
        let mut mix = VoiceMix::default();
        assert!(mix.toggle_mute(Voice::Lead));
        assert_eq!(mix.effective_gain_db(Voice::Lead), MUTED_DB);
        assert!(!mix.toggle_mute(Voice::Lead));
        assert!((mix.effective_gain_db(Voice::Lead) - (-8.0)).abs() < 1e-9);
    }

    #[test]
    fn test_setters_clamp() {
        let mut mix = VoiceMix::default();
        mix.set_master(3.0);
        assert_eq!(mix.master, 1.0);
        mix.set_volume(Voice::Bass, -0.5);
        assert_eq!(mix.volume(Voice::Bass), 0.0);
        mix.set_volume(Voice::Bass, f64::NAN);
        assert_eq!(mix.volume(Voice::Bass), 0.0);
    }
}
