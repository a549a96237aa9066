//! Configuration management
//!
//! Runtime configuration loaded from JSON, so tempo, scale, timing envelope,
//! LFO routing and voice settings can be adjusted without recompiling.
//! Every section has `Default` values and a `sanitize` pass that clamps
//! out-of-range input rather than rejecting it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::modulation::{clamp_depth, clamp_rate, ModTarget, LFO_SLOTS};
use crate::error::ConfigError;
use crate::music::{clamp_tempo, Scale, ScalePreset, DEFAULT_TEMPO_BPM};
use crate::voice::{VoiceBank, VoiceMix};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub composition: CompositionConfig,
    pub playback: PlaybackConfig,
    pub modulation: ModulationConfig,
    pub voices: VoiceBank,
    pub mix: VoiceMix,
}

/// Musical material and the playback length envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Transport tempo in BPM (40-140)
    pub tempo: f64,
    /// Lead and pad scale
    pub scale: ScalePreset,
    /// Low register used for bass roots
    pub bass_scale: Scale,
    /// Desired piece length before per-segment clamping
    pub target_total_seconds: f64,
    pub min_seconds_per_segment: f64,
    pub max_seconds_per_segment: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO_BPM,
            scale: ScalePreset::Ambient,
            bass_scale: Scale::bass(),
            target_total_seconds: 180.0,
            min_seconds_per_segment: 0.5,
            max_seconds_per_segment: 2.0,
        }
    }
}

impl CompositionConfig {
    /// Seconds of music per data segment.
    ///
    /// `clamp(target_total_seconds / segment_count, min, max)`, so short
    /// datasets are stretched and long ones compressed into a listenable
    /// length.
    pub fn seconds_per_segment(&self, segment_count: usize) -> f64 {
        let count = segment_count.max(1) as f64;
        (self.target_total_seconds / count)
            .clamp(self.min_seconds_per_segment, self.max_seconds_per_segment)
    }

    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        self.tempo = clamp_tempo(self.tempo);
        if !self.target_total_seconds.is_finite() || self.target_total_seconds <= 0.0 {
            self.target_total_seconds = defaults.target_total_seconds;
        }
        if !self.min_seconds_per_segment.is_finite() || self.min_seconds_per_segment <= 0.0 {
            self.min_seconds_per_segment = defaults.min_seconds_per_segment;
        }
        if !self.max_seconds_per_segment.is_finite()
            || self.max_seconds_per_segment < self.min_seconds_per_segment
        {
            self.max_seconds_per_segment = self
                .min_seconds_per_segment
                .max(defaults.max_seconds_per_segment);
        }
    }
}

/// Poll intervals of the periodic playback tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress polling interval in milliseconds
    pub progress_interval_ms: u64,
    /// LFO update interval in milliseconds
    pub modulation_interval_ms: u64,
    /// Capacity of the playback event channel
    pub event_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            modulation_interval_ms: 33,
            event_buffer: 1024,
        }
    }
}

impl PlaybackConfig {
    pub fn sanitize(&mut self) {
        self.progress_interval_ms = self.progress_interval_ms.clamp(10, 1000);
        self.modulation_interval_ms = self.modulation_interval_ms.clamp(10, 1000);
        self.event_buffer = self.event_buffer.max(16);
    }
}

/// One LFO slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoSlotConfig {
    /// Parameter this slot drives; `None` leaves the slot idle
    pub target: Option<ModTarget>,
    pub rate_hz: f64,
    pub depth: f64,
}

impl Default for LfoSlotConfig {
    fn default() -> Self {
        Self {
            target: None,
            rate_hz: 0.1,
            depth: 0.5,
        }
    }
}

impl LfoSlotConfig {
    pub fn sanitize(&mut self) {
        self.rate_hz = clamp_rate(self.rate_hz);
        self.depth = clamp_depth(self.depth);
    }
}

/// LFO routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationConfig {
    pub slots: [LfoSlotConfig; LFO_SLOTS],
}

impl ModulationConfig {
    pub fn sanitize(&mut self) {
        for slot in &mut self.slots {
            slot.sanitize();
        }
    }
}

impl AppConfig {
    /// Clamp every section into range.
    pub fn sanitize(&mut self) -> Vec<String> {
        self.composition.sanitize();
        self.playback.sanitize();
        self.modulation.sanitize();
        self.mix.sanitize();
        self.voices.sanitize()
    }

    /// Parse and sanitize a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = serde_json::from_str(json)?;
        let clamped = config.sanitize();
        if !clamped.is_empty() {
            log::warn!("[Config] Clamped voice fields: {}", clamped.join(", "));
        }
        Ok(config)
    }

    /// Read a configuration file, reporting failures.
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// invalid (a warning is logged).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.composition.tempo, 75.0);
        assert_eq!(config.composition.scale, ScalePreset::Ambient);
        assert_eq!(config.composition.target_total_seconds, 180.0);
        assert_eq!(config.playback.progress_interval_ms, 100);
        assert_eq!(config.playback.modulation_interval_ms, 33);
        assert!(config.modulation.slots.iter().all(|s| s.target.is_none()));
    }

    #[test]
    fn test_seconds_per_segment_band() {
        let composition = CompositionConfig::default();
        assert_eq!(composition.seconds_per_segment(720), 0.5);
        assert_eq!(composition.seconds_per_segment(120), 1.5);
        assert_eq!(composition.seconds_per_segment(10), 2.0);
        assert_eq!(composition.seconds_per_segment(0), 2.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = AppConfig::default();
        config.modulation.slots[0].target = Some(ModTarget::LeadFilterCutoff);
        config.composition.scale = ScalePreset::Minor;
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_is_clamped() {
        let json = r#"{
            "composition": { "tempo": 500, "scale": "major" },
            "modulation": { "slots": [ { "target": "pad_detune", "depth": 4.0 }, {} ] }
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.composition.tempo, 140.0);
        assert_eq!(config.composition.scale, ScalePreset::Major);
        assert_eq!(config.composition.bass_scale, Scale::bass());
        assert_eq!(config.modulation.slots[0].target, Some(ModTarget::PadDetune));
        assert_eq!(config.modulation.slots[0].depth, 1.0);
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/bird_log.json");
        assert_eq!(config, AppConfig::default());
        assert!(matches!(
            AppConfig::try_load_from_file("/nonexistent/bird_log.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
