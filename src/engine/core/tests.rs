use super::*;
use crate::engine::backend::{InstrumentCall, RecordingInstrument};
use crate::voice::mix::MUTED_DB;

impl PlaybackController {
    fn new_test(config: AppConfig) -> (Self, Arc<RecordingInstrument>) {
        let instrument = Arc::new(RecordingInstrument::new());
        let controller = Self::new(config, instrument.clone());
        (controller, instrument)
    }
}

fn busy_segments(count: usize) -> Vec<Segment> {
    (0..count)
        .map(|i| Segment {
            avg_acc: 1.2 + (i % 4) as f64 * 0.1,
            max_acc: 2.5,
            avg_rot: 0.3,
            steps: 35,
            fidgets: (i % 3) as u32,
        })
        .collect()
}

fn drain(rx: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_empty_dataset_is_rejected_without_transition() {
    let (controller, _) = PlaybackController::new_test(AppConfig::default());
    let mut rx = controller.subscribe();

    assert_eq!(controller.start(&[]), Err(PlaybackError::EmptyDataset));
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert!(!controller.is_playing());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_start_outside_runtime_reports_error() {
    let (controller, _) = PlaybackController::new_test(AppConfig::default());
    let err = controller.start(&busy_segments(4)).unwrap_err();
    assert!(matches!(err, PlaybackError::RuntimeUnavailable { .. }));
    assert_eq!(controller.state(), PlaybackState::Idle);
}

#[test]
fn test_stop_when_idle_is_noop() {
    let (controller, instrument) = PlaybackController::new_test(AppConfig::default());
    let mut rx = controller.subscribe();
    controller.stop();
    controller.stop();
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert!(drain(&mut rx).is_empty());
    assert!(!instrument.calls().contains(&InstrumentCall::ReleaseAll));
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_first_event_clears_everything() {
    let (controller, instrument) = PlaybackController::new_test(AppConfig::default());
    let mut rx = controller.subscribe();

    let plan = controller.start(&busy_segments(30)).unwrap();
    assert!(plan.scheduled_events > 0);
    assert_eq!(controller.active_handle_count(), plan.scheduled_events);
    assert_eq!(controller.state(), PlaybackState::Playing);

    controller.stop();
    controller.stop();

    assert_eq!(controller.active_handle_count(), 0);
    assert_eq!(controller.transport().pending(), 0);
    assert_eq!(controller.state(), PlaybackState::Stopped);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(instrument.triggers().is_empty());

    let events = drain(&mut rx);
    assert!(matches!(events[0], PlaybackEvent::Started { .. }));
    let stopped = events
        .iter()
        .filter(|e| **e == PlaybackEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
    assert!(!events.contains(&PlaybackEvent::Finished));
}

#[tokio::test(start_paused = true)]
async fn test_full_session_reports_progress_then_finishes_once() {
    let (controller, instrument) = PlaybackController::new_test(AppConfig::default());
    let mut rx = controller.subscribe();

    // 10 segments -> 2.0 s each -> 20 s piece
    let plan = controller.start(&busy_segments(10)).unwrap();
    assert_eq!(plan.seconds_per_segment, 2.0);
    assert_eq!(plan.duration_seconds, 20.0);

    tokio::time::sleep(Duration::from_secs(25)).await;

    assert_eq!(controller.state(), PlaybackState::Finished);
    assert!(!controller.is_playing());
    assert_eq!(controller.transport().pending(), 0);
    assert!(!instrument.triggers().is_empty());

    let events = drain(&mut rx);
    let fractions: Vec<f64> = events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.iter().filter(|f| **f == 1.0).count(), 1);

    let finished_at = events
        .iter()
        .position(|e| *e == PlaybackEvent::Finished)
        .unwrap();
    assert_eq!(finished_at, events.len() - 1);
    assert!(matches!(
        events[finished_at - 1],
        PlaybackEvent::Progress { fraction, .. } if fraction == 1.0
    ));
    assert!(!events.contains(&PlaybackEvent::Stopped));

    // A late stop does nothing
    controller.stop();
    assert_eq!(controller.state(), PlaybackState::Finished);
}

#[tokio::test(start_paused = true)]
async fn test_modulated_parameters_reset_on_stop() {
    let mut config = AppConfig::default();
    config.modulation.slots[0].target = Some(ModTarget::LeadFilterCutoff);
    config.modulation.slots[0].rate_hz = 1.0;
    config.modulation.slots[0].depth = 1.0;
    config.modulation.slots[1].target = Some(ModTarget::PadDetune);
    let (controller, instrument) = PlaybackController::new_test(config);

    controller.start(&busy_segments(20)).unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;

    let swept = instrument
        .calls()
        .iter()
        .filter(|call| matches!(call, InstrumentCall::Param { .. }))
        .count();
    assert!(swept > 10);

    controller.stop();
    let voices = controller.voices();
    assert_eq!(
        instrument.param(ModTarget::LeadFilterCutoff),
        Some(voices.lead.filter_cutoff_hz)
    );
    assert_eq!(instrument.param(ModTarget::PadDetune), Some(voices.pad.detune_cents));

    // The loop is gone: no further writes
    let after_stop = instrument.calls().len();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(instrument.calls().len(), after_stop);
}

#[tokio::test(start_paused = true)]
async fn test_retarget_while_playing_restores_old_parameter() {
    let mut config = AppConfig::default();
    config.modulation.slots[0].target = Some(ModTarget::LeadHarmonicity);
    config.modulation.slots[0].depth = 1.0;
    let (controller, instrument) = PlaybackController::new_test(config);

    controller.start(&busy_segments(20)).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    controller.set_modulation_target(0, Some(ModTarget::LeadReverbSend));
    assert_eq!(instrument.param(ModTarget::LeadHarmonicity), Some(1.5));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(instrument.param(ModTarget::LeadReverbSend).is_some());
    controller.stop();
}

#[test]
fn test_retarget_while_stopped_only_records_selection() {
    let (controller, instrument) = PlaybackController::new_test(AppConfig::default());
    controller.set_modulation_target(1, Some(ModTarget::PadDetune));
    controller.set_modulation_target(7, Some(ModTarget::PadDetune));
    controller.set_modulation_depth(1, 3.0);
    controller.set_modulation_rate(1, 0.0);

    let slot = controller.config().modulation.slots[1];
    assert_eq!(slot.target, Some(ModTarget::PadDetune));
    assert_eq!(slot.depth, 1.0);
    assert_eq!(slot.rate_hz, 0.01);
    assert!(!instrument
        .calls()
        .iter()
        .any(|call| matches!(call, InstrumentCall::Param { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_restart_while_playing() {
    let (controller, _) = PlaybackController::new_test(AppConfig::default());
    let mut rx = controller.subscribe();

    controller.start(&busy_segments(10)).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let plan = controller.start(&busy_segments(40)).unwrap();

    assert!(controller.is_playing());
    assert_eq!(controller.active_handle_count(), plan.scheduled_events);
    assert!(controller.transport().now() < 0.01);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Warning { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Started { .. }))
            .count(),
        2
    );
    controller.stop();
}

#[test]
fn test_settings_clamp_and_reach_the_instrument() {
    let (controller, instrument) = PlaybackController::new_test(AppConfig::default());

    assert_eq!(controller.set_tempo(300.0), 140.0);
    assert_eq!(controller.config().composition.tempo, 140.0);
    assert!(controller.set_scale_by_name("lydian").is_err());
    assert_eq!(controller.set_scale_by_name("Minor").unwrap(), ScalePreset::Minor);

    assert!(controller.toggle_mute(Voice::Pad));
    assert_eq!(instrument.voice_gain(Voice::Pad), Some(MUTED_DB));
    controller.set_volume(Voice::Percussion, 9.0);
    assert_eq!(controller.config().mix.percussion.volume, 1.0);

    let configured = |calls: &[InstrumentCall]| {
        calls
            .iter()
            .filter(|c| **c == InstrumentCall::ConfigureVoices)
            .count()
    };
    let before = configured(&instrument.calls());
    controller.apply_preset(BodyPart::Body, 3).unwrap();
    assert_eq!(controller.voices().lead.harmonicity, 3.5);
    assert!(controller.apply_preset(BodyPart::Body, 9).is_err());
    assert_eq!(controller.cycle_preset(BodyPart::Body), 4);
    assert_eq!(controller.voices().lead.harmonicity, 4.0);
    assert_eq!(configured(&instrument.calls()), before + 2);

    let clamped = controller
        .import_voices(r#"{ "lead": { "delay_send": 2.0 } }"#)
        .unwrap();
    assert_eq!(clamped, vec!["lead.delay_send"]);
    assert_eq!(controller.voices().lead.delay_send, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_event_stream_yields_lifecycle() {
    let (controller, _) = PlaybackController::new_test(AppConfig::default());
    let stream = controller.events();
    tokio::pin!(stream);

    controller.start(&busy_segments(5)).unwrap();
    controller.stop();

    let first = stream.next().await.unwrap();
    assert!(matches!(first, PlaybackEvent::Started { segment_count: 5, .. }));
    assert_eq!(stream.next().await.unwrap(), PlaybackEvent::Stopped);
}
