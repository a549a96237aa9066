//! PlaybackController: drives one composition session at a time.
//!
//! The controller owns every piece of mutable engine state (configuration,
//! preset cursor, LFO state, the handle list of the running piece) and
//! publishes lifecycle and progress notifications as [`PlaybackEvent`]s on a
//! broadcast channel. Two periodic tokio tasks run per session: progress
//! polling on the transport clock and LFO updates on wall-clock time. Both
//! exit on the first tick after the session ends.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::Stream;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::analysis::{Segment, SegmentSet};
use crate::config::AppConfig;
use crate::engine::backend::{Instrument, SystemTimeSource, TimeSource, TokioTransport, Transport};
use crate::engine::modulation::{clamp_depth, clamp_rate, ModTarget, Modulator, LFO_SLOTS};
use crate::error::{log_playback_error, ConfigError, PlaybackError};
use crate::music::{clamp_tempo, CompositionScheduler, EventHandle, Scale, ScalePreset};
use crate::voice::{
    apply_preset, cycle_preset, randomize_section, BodyPart, LeadSection, PresetCursor, Voice,
    VoiceBank, VoiceMix,
};

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Stopped,
    Finished,
}

/// Notification published by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started {
        duration_seconds: f64,
        segment_count: usize,
        scheduled_events: usize,
    },
    Progress {
        fraction: f64,
        elapsed_seconds: f64,
    },
    Stopped,
    Finished,
    Warning {
        message: String,
    },
}

/// What `start` laid out
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionPlan {
    pub duration_seconds: f64,
    pub seconds_per_segment: f64,
    pub scheduled_events: usize,
}

#[derive(Default)]
struct Session {
    state: PlaybackState,
    generation: u64,
    handles: Vec<EventHandle>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    config: RwLock<AppConfig>,
    transport: Arc<dyn Transport>,
    instrument: Arc<dyn Instrument>,
    time_source: Arc<dyn TimeSource>,
    session: Mutex<Session>,
    modulator: Mutex<Modulator>,
    presets: Mutex<PresetCursor>,
    is_playing: AtomicBool,
    events_tx: broadcast::Sender<PlaybackEvent>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("[Playback] {} lock poisoned, recovering", name);
        poisoned.into_inner()
    })
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log::warn!("[Playback] Config lock poisoned, recovering");
        poisoned.into_inner()
    })
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log::warn!("[Playback] Config lock poisoned, recovering");
        poisoned.into_inner()
    })
}

impl Inner {
    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn is_current(&self, session: &Session, generation: u64) -> bool {
        session.generation == generation && self.is_playing.load(Ordering::SeqCst)
    }

    /// End the running session, if any, moving to `final_state`.
    ///
    /// With `expected` set, only that session generation is halted. Returns
    /// `true` if this call performed the transition.
    fn halt(&self, expected: Option<u64>, final_state: PlaybackState) -> bool {
        let (handles, tasks) = {
            let mut session = lock(&self.session, "session");
            if expected.is_some_and(|generation| generation != session.generation) {
                return false;
            }
            if !self.is_playing.swap(false, Ordering::SeqCst) {
                return false;
            }
            session.state = final_state;
            (
                std::mem::take(&mut session.handles),
                std::mem::take(&mut session.tasks),
            )
        };

        let cancelled = handles
            .iter()
            .filter(|handle| self.transport.cancel(**handle))
            .count();
        self.transport.stop();
        self.instrument.release_all();

        let voices = read(&self.config).voices;
        lock(&self.modulator, "modulator").reset(&voices, self.instrument.as_ref());

        for task in tasks {
            task.abort();
        }

        log::info!(
            "[Playback] Session ended ({:?}), cancelled {} pending events",
            final_state,
            cancelled
        );
        true
    }

    fn push_mix(&self, mix: &VoiceMix) {
        self.instrument.set_master_gain(mix.master);
        for voice in Voice::ALL {
            self.instrument
                .set_voice_gain(voice, mix.effective_gain_db(voice));
        }
    }
}

async fn run_progress(inner: Arc<Inner>, generation: u64, duration: f64, interval_ms: u64) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let elapsed = {
            let session = lock(&inner.session, "session");
            if !inner.is_current(&session, generation) {
                break;
            }
            let elapsed = inner.transport.now();
            let fraction = (elapsed / duration).min(1.0);
            if fraction < 1.0 {
                inner.emit(PlaybackEvent::Progress {
                    fraction,
                    elapsed_seconds: elapsed,
                });
                continue;
            }
            elapsed
        };

        if inner.halt(Some(generation), PlaybackState::Finished) {
            inner.emit(PlaybackEvent::Progress {
                fraction: 1.0,
                elapsed_seconds: elapsed,
            });
            inner.emit(PlaybackEvent::Finished);
            log::info!("[Playback] Finished after {:.1}s", elapsed);
        }
        break;
    }
}

async fn run_modulation(inner: Arc<Inner>, generation: u64, started_at: Instant, interval_ms: u64) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let session = lock(&inner.session, "session");
        if !inner.is_current(&session, generation) {
            break;
        }
        let t = inner
            .time_source
            .now()
            .saturating_duration_since(started_at)
            .as_secs_f64();
        let config = read(&inner.config);
        lock(&inner.modulator, "modulator").tick(
            t,
            &config.modulation,
            &config.voices,
            inner.instrument.as_ref(),
        );
    }
    tracing::debug!(generation, "[Modulation] loop exited");
}

/// Explicit engine instance; nothing here is global.
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    /// Controller with a tokio transport on the system clock.
    pub fn new(config: AppConfig, instrument: Arc<dyn Instrument>) -> Self {
        let time_source: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::default());
        let transport = Arc::new(TokioTransport::new(
            Arc::clone(&instrument),
            Arc::clone(&time_source),
        ));
        Self::with_backends(config, instrument, transport, time_source)
    }

    pub fn with_backends(
        mut config: AppConfig,
        instrument: Arc<dyn Instrument>,
        transport: Arc<dyn Transport>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let clamped = config.sanitize();
        if !clamped.is_empty() {
            log::warn!("[Playback] Clamped voice fields: {}", clamped.join(", "));
        }
        let (events_tx, _) = broadcast::channel(config.playback.event_buffer);

        instrument.configure_voices(&config.voices);
        let inner = Arc::new(Inner {
            config: RwLock::new(config),
            transport,
            instrument,
            time_source,
            session: Mutex::new(Session::default()),
            modulator: Mutex::new(Modulator::new()),
            presets: Mutex::new(PresetCursor::default()),
            is_playing: AtomicBool::new(false),
            events_tx,
        });
        inner.push_mix(&read(&inner.config).mix);

        Self { inner }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Compose `segments` and start playing it.
    ///
    /// Fails with `EmptyDataset` (no state change) when `segments` is empty.
    /// Starting while already playing stops the current piece first.
    pub fn start(&self, segments: &[Segment]) -> Result<SessionPlan, PlaybackError> {
        let Some(segment_set) = SegmentSet::from_segments(segments.to_vec()) else {
            let err = PlaybackError::EmptyDataset;
            log_playback_error(&err, "start");
            return Err(err);
        };
        let runtime = Handle::try_current().map_err(|err| {
            let err = PlaybackError::RuntimeUnavailable {
                reason: err.to_string(),
            };
            log_playback_error(&err, "start");
            err
        })?;

        if self.is_playing() {
            log::info!("[Playback] Start requested while playing, restarting");
            self.inner.emit(PlaybackEvent::Warning {
                message: "playback restarted".to_string(),
            });
            self.stop();
        }

        let config = self.config();
        let composition = &config.composition;
        let seconds_per_segment = composition.seconds_per_segment(segment_set.len());
        let duration = segment_set.len() as f64 * seconds_per_segment;
        let scheduler = CompositionScheduler::new(
            Scale::from_preset(composition.scale),
            composition.bass_scale.clone(),
            composition.tempo,
            seconds_per_segment,
        );

        let mut session = lock(&self.inner.session, "session");
        let handles = scheduler.schedule(&segment_set, self.inner.transport.as_ref());

        if let Err(err) = self.inner.transport.start() {
            for handle in &handles {
                self.inner.transport.cancel(*handle);
            }
            log_playback_error(&err, "start");
            return Err(err);
        }

        session.generation += 1;
        let generation = session.generation;
        let started_at = self.inner.time_source.now();
        let plan = SessionPlan {
            duration_seconds: duration,
            seconds_per_segment,
            scheduled_events: handles.len(),
        };
        session.handles = handles;
        session.state = PlaybackState::Playing;
        self.inner.is_playing.store(true, Ordering::SeqCst);

        let mut rng = rand::thread_rng();
        let phases: [f64; LFO_SLOTS] = [rng.gen_range(0.0..TAU), rng.gen_range(0.0..TAU)];
        lock(&self.inner.modulator, "modulator").begin(phases);

        self.inner.emit(PlaybackEvent::Started {
            duration_seconds: duration,
            segment_count: segment_set.len(),
            scheduled_events: plan.scheduled_events,
        });

        session.tasks = vec![
            runtime.spawn(run_progress(
                Arc::clone(&self.inner),
                generation,
                duration,
                config.playback.progress_interval_ms,
            )),
            runtime.spawn(run_modulation(
                Arc::clone(&self.inner),
                generation,
                started_at,
                config.playback.modulation_interval_ms,
            )),
        ];

        log::info!(
            "[Playback] Started: {} segments, {:.1}s at {:.2}s/segment, {} events",
            segment_set.len(),
            duration,
            seconds_per_segment,
            plan.scheduled_events
        );
        Ok(plan)
    }

    /// Stop playback. Safe to call at any time; a no-op when nothing plays.
    pub fn stop(&self) {
        if self.inner.halt(None, PlaybackState::Stopped) {
            self.inner.emit(PlaybackEvent::Stopped);
        } else {
            log::debug!("[Playback] stop() while not playing, ignoring");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.is_playing.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.inner.session, "session").state
    }

    /// Handles held for the running piece
    pub fn active_handle_count(&self) -> usize {
        lock(&self.inner.session, "session").handles.len()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    // ========================================================================
    // OBSERVERS
    // ========================================================================

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Event stream; lagged notifications are dropped.
    pub fn events(&self) -> impl Stream<Item = PlaybackEvent> {
        BroadcastStream::new(self.inner.events_tx.subscribe()).filter_map(|item| item.ok())
    }

    // ========================================================================
    // COMPOSITION SETTINGS (take effect on next start)
    // ========================================================================

    pub fn config(&self) -> AppConfig {
        read(&self.inner.config).clone()
    }

    /// Returns the tempo actually stored after clamping.
    pub fn set_tempo(&self, bpm: f64) -> f64 {
        let tempo = clamp_tempo(bpm);
        write(&self.inner.config).composition.tempo = tempo;
        tempo
    }

    pub fn set_scale(&self, preset: ScalePreset) {
        write(&self.inner.config).composition.scale = preset;
    }

    pub fn set_scale_by_name(&self, name: &str) -> Result<ScalePreset, ConfigError> {
        let preset: ScalePreset = name.parse()?;
        self.set_scale(preset);
        Ok(preset)
    }

    // ========================================================================
    // MIX
    // ========================================================================

    pub fn set_master_volume(&self, value: f64) {
        self.update_mix(|mix| mix.set_master(value));
    }

    pub fn set_volume(&self, voice: Voice, value: f64) {
        self.update_mix(|mix| mix.set_volume(voice, value));
    }

    pub fn set_mute(&self, voice: Voice, muted: bool) {
        self.update_mix(|mix| mix.set_mute(voice, muted));
    }

    /// Returns the new mute state.
    pub fn toggle_mute(&self, voice: Voice) -> bool {
        self.update_mix(|mix| mix.toggle_mute(voice))
    }

    fn update_mix<T>(&self, f: impl FnOnce(&mut VoiceMix) -> T) -> T {
        let (result, mix) = {
            let mut config = write(&self.inner.config);
            let result = f(&mut config.mix);
            (result, config.mix)
        };
        self.inner.push_mix(&mix);
        result
    }

    // ========================================================================
    // VOICES
    // ========================================================================

    pub fn voices(&self) -> VoiceBank {
        read(&self.inner.config).voices
    }

    pub fn apply_preset(&self, part: BodyPart, index: usize) -> Result<(), ConfigError> {
        self.update_voices(|voices| apply_preset(&mut voices.lead, part, index))?;
        lock(&self.inner.presets, "presets").set(part, index);
        Ok(())
    }

    /// Advance `part` to its next preset; returns the new index.
    pub fn cycle_preset(&self, part: BodyPart) -> usize {
        let mut cursor = lock(&self.inner.presets, "presets");
        self.update_voices(|voices| cycle_preset(&mut cursor, &mut voices.lead, part))
    }

    pub fn randomize_section(&self, section: LeadSection) {
        self.update_voices(|voices| {
            randomize_section(&mut voices.lead, section, &mut rand::thread_rng())
        });
    }

    /// Replace the voice bank from JSON; returns the fields that had to be
    /// clamped.
    pub fn import_voices(&self, json: &str) -> Result<Vec<String>, ConfigError> {
        let (bank, clamped) = VoiceBank::import_json(json)?;
        self.update_voices(|voices| *voices = bank);
        Ok(clamped)
    }

    fn update_voices<T>(&self, f: impl FnOnce(&mut VoiceBank) -> T) -> T {
        let (result, before, voices) = {
            let mut config = write(&self.inner.config);
            let before = config.voices;
            let result = f(&mut config.voices);
            (result, before, config.voices)
        };
        if voices != before {
            self.inner.instrument.configure_voices(&voices);
        }
        result
    }

    // ========================================================================
    // MODULATION
    // ========================================================================

    /// Point an LFO slot at a parameter, or detach it with `None`.
    ///
    /// While stopped this only records the selection for the next session.
    /// While playing, a parameter no longer driven by any slot snaps back to
    /// its base value.
    pub fn set_modulation_target(&self, slot: usize, target: Option<ModTarget>) {
        if slot >= LFO_SLOTS {
            log::warn!("[Modulation] No LFO slot {}, ignoring", slot);
            return;
        }
        let mut config = write(&self.inner.config);
        let previous = std::mem::replace(&mut config.modulation.slots[slot].target, target);

        if !self.is_playing() {
            return;
        }
        if let Some(previous) = previous.filter(|p| Some(*p) != target) {
            lock(&self.inner.modulator, "modulator").release(
                previous,
                &config.modulation,
                &config.voices,
                self.inner.instrument.as_ref(),
            );
        }
    }

    pub fn set_modulation_depth(&self, slot: usize, depth: f64) {
        match write(&self.inner.config).modulation.slots.get_mut(slot) {
            Some(lfo) => lfo.depth = clamp_depth(depth),
            None => log::warn!("[Modulation] No LFO slot {}, ignoring", slot),
        }
    }

    pub fn set_modulation_rate(&self, slot: usize, rate_hz: f64) {
        match write(&self.inner.config).modulation.slots.get_mut(slot) {
            Some(lfo) => lfo.rate_hz = clamp_rate(rate_hz),
            None => log::warn!("[Modulation] No LFO slot {}, ignoring", slot),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.inner.halt(None, PlaybackState::Stopped);
    }
}

#[cfg(test)]
mod tests;
