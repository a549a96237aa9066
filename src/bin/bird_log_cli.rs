use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bird_log::analysis::RawSample;
use bird_log::config::AppConfig;
use bird_log::data::{generate_demo_segments, Dataset, FeedUpdate, SampleAccumulator};
use bird_log::engine::{Instrument, ModTarget, PlaybackController, PlaybackEvent, RecordingScheduler};
use bird_log::music::{CompositionScheduler, MusicEvent, PercussionKind, Pitch, Scale, ScalePreset};
use bird_log::voice::{Voice, VoiceBank};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(
    name = "bird_log_cli",
    about = "Turn a day of bird motion into an ambient composition"
)]
struct Cli {
    /// JSON configuration file (defaults are used when missing or invalid)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// JSON array of [ax, ay, az, gx, gy, gz] samples
    #[arg(long, conflicts_with = "demo")]
    input: Option<PathBuf>,
    /// Use a synthetic demo day instead of recorded samples
    #[arg(long)]
    demo: bool,
    /// Seed for the demo generator and composition draws
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print dataset summary and metadata as JSON
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Schedule a full piece offline and print one JSON event per line
    Compose {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        tempo: Option<f64>,
        #[arg(long)]
        scale: Option<String>,
    },
    /// Play the piece in real time through a logging instrument
    Play {
        #[command(flatten)]
        source: SourceArgs,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f64>,
    },
    /// Replay a logger message log (one JSON message per line)
    Feed {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Summary { source } => run_summary(&source),
        Commands::Compose {
            source,
            tempo,
            scale,
        } => run_compose(config, &source, tempo, scale.as_deref()),
        Commands::Play { source, seconds } => run_play(config, &source, seconds),
        Commands::Feed { log } => run_feed(&log),
    }
}

fn rng_for(source: &SourceArgs) -> StdRng {
    match source.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_samples(path: &Path) -> Result<Vec<RawSample>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading samples from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing samples in {}", path.display()))
}

fn load_dataset(source: &SourceArgs) -> Result<Dataset> {
    if source.demo {
        return Ok(Dataset::from_segments(generate_demo_segments(&mut rng_for(source))));
    }
    match &source.input {
        Some(path) => Ok(Dataset::from_samples(&load_samples(path)?)),
        None => bail!("either --input <FILE> or --demo is required"),
    }
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    summary: &'a bird_log::data::DatasetSummary,
    metadata: &'a bird_log::data::DatasetMetadata,
}

fn print_summary(dataset: &Dataset) -> Result<()> {
    let report = SummaryReport {
        summary: &dataset.summary,
        metadata: &dataset.metadata,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_summary(source: &SourceArgs) -> Result<ExitCode> {
    let dataset = load_dataset(source)?;
    print_summary(&dataset)?;
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ComposeLine<'a> {
    time: f64,
    #[serde(flatten)]
    event: &'a MusicEvent,
}

fn run_compose(
    config: AppConfig,
    source: &SourceArgs,
    tempo: Option<f64>,
    scale: Option<&str>,
) -> Result<ExitCode> {
    let dataset = load_dataset(source)?;
    let composition = config.composition;
    let preset = match scale {
        Some(name) => name.parse::<ScalePreset>()?,
        None => composition.scale,
    };
    let seconds_per_segment = composition.seconds_per_segment(dataset.segments.len());
    let scheduler = CompositionScheduler::new(
        Scale::from_preset(preset),
        composition.bass_scale.clone(),
        tempo.unwrap_or(composition.tempo),
        seconds_per_segment,
    );

    let recorder = RecordingScheduler::new();
    scheduler.schedule_with_rng(&dataset.segments, &recorder, &mut rng_for(source));

    for (time, event) in recorder.timeline() {
        println!("{}", serde_json::to_string(&ComposeLine { time, event: &event })?);
    }
    Ok(ExitCode::from(0))
}

/// Instrument that only logs what it would play.
struct LoggingInstrument;

impl Instrument for LoggingInstrument {
    fn trigger_note(&self, voice: Voice, pitch: Pitch, duration: f64, time: f64, velocity: f64) {
        log::info!(
            "[Instrument] {:>6.2}s {} {} ({:.2}s, v={:.2})",
            time,
            voice,
            pitch,
            duration,
            velocity
        );
    }

    fn trigger_percussion(&self, kind: PercussionKind, time: f64, velocity: f64) {
        log::info!("[Instrument] {:>6.2}s {:?} (v={:.2})", time, kind, velocity);
    }

    fn release_all(&self) {
        log::info!("[Instrument] Release all");
    }

    fn set_param(&self, target: ModTarget, value: f64) {
        log::trace!("[Instrument] {} = {:.3}", target, value);
    }

    fn set_voice_gain(&self, voice: Voice, gain_db: f64) {
        log::debug!("[Instrument] {} gain {:.1} dB", voice, gain_db);
    }

    fn set_master_gain(&self, gain: f64) {
        log::debug!("[Instrument] Master gain {:.2}", gain);
    }

    fn configure_voices(&self, _voices: &VoiceBank) {
        log::debug!("[Instrument] Voices configured");
    }
}

/// How long `play` runs before stopping; unbounded when the flag is absent or unusable.
fn play_limit(seconds: Option<f64>) -> Duration {
    seconds
        .filter(|s| s.is_finite() && *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .unwrap_or(Duration::MAX)
}

fn run_play(config: AppConfig, source: &SourceArgs, seconds: Option<f64>) -> Result<ExitCode> {
    let dataset = load_dataset(source)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        let controller = PlaybackController::new(config, Arc::new(LoggingInstrument));
        let events = controller.events();
        tokio::pin!(events);

        let plan = controller.start(&dataset.segments)?;
        eprintln!(
            "Playing {:.0}s piece ({} events)",
            plan.duration_seconds, plan.scheduled_events
        );

        let deadline = tokio::time::sleep(play_limit(seconds));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(PlaybackEvent::Progress { fraction, elapsed_seconds }) => {
                        eprint!("\r{:>5.1}%  {:>6.1}s", fraction * 100.0, elapsed_seconds);
                    }
                    Some(PlaybackEvent::Warning { message }) => eprintln!("\nwarning: {message}"),
                    Some(PlaybackEvent::Finished) | Some(PlaybackEvent::Stopped) | None => break,
                    Some(_) => {}
                },
                _ = &mut deadline => {
                    controller.stop();
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    controller.stop();
                    break;
                }
            }
        }
        eprintln!();
        Ok::<_, anyhow::Error>(())
    })?;

    Ok(ExitCode::from(0))
}

fn run_feed(path: &Path) -> Result<ExitCode> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading feed log {}", path.display()))?;
    let mut accumulator = SampleAccumulator::new();
    let mut dataset = None;

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match accumulator.handle_text(line) {
            Ok(FeedUpdate::Progress { percent }) => log::debug!("[Feed] {}%", percent),
            Ok(FeedUpdate::Complete(complete)) => dataset = Some(complete),
            Ok(_) => {}
            Err(err) => eprintln!("line {}: {}", line_no + 1, err),
        }
    }

    match dataset {
        Some(dataset) => {
            print_summary(&dataset)?;
            Ok(ExitCode::from(0))
        }
        None => {
            eprintln!("Feed log ended before a complete dump");
            Ok(ExitCode::from(2))
        }
    }
}
