use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pipsync::backend::{FloatingSnapshot, SimulatedDevice, SimulatedEngine, SimulatedFloating};
use pipsync::events::EventQueue;
use pipsync::pip::PipLifecycleState;
use pipsync::player::{Direction, MediaReference, PlaybackState, PlayerController};
use pipsync::utils::{format_timestamp, load_config};

/// Simulated wall time per demo tick
const TICK: Duration = Duration::from_millis(100);

/// Simulated media seconds per demo tick at 1.0x
const MEDIA_STEP: f64 = 0.5;

/// pipsync - picture-in-picture playback coordinator demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media locators to play, replacing the configured playlist
    #[arg(value_name = "MEDIA")]
    playlist: Vec<String>,

    /// Extra configuration file applied after the user file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Playback speed (1.0 = normal)
    #[arg(short, long, value_name = "SPEED")]
    speed: Option<f64>,

    /// Treat the end of each item as a loop point
    #[arg(long)]
    loop_mode: bool,

    /// Continue with the next item at the end
    #[arg(long)]
    auto_advance: bool,

    /// Render the floating window through the sample-buffer backend
    #[arg(long, value_name = "BOOL")]
    low_level_backend: Option<bool>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the final state as JSON
    #[arg(long)]
    dump_state: bool,
}

/// Final state printed with `--dump-state`
#[derive(Serialize)]
struct DemoReport {
    playback: PlaybackState,
    lifecycle: PipLifecycleState,
    floating: FloatingSnapshot,
}

/// One scripted step of the demo session
#[derive(Debug, Clone, Copy)]
enum Step {
    Play,
    TapOverlay,
    Prepare,
    Start,
    FloatingSeek(f64),
    Switch(Direction),
    Hide,
    Resume,
    FloatingPause,
    FloatingPlay,
    Restore,
}

const SCRIPT: &[(u32, Step)] = &[
    (0, Step::Play),
    (2, Step::TapOverlay),
    (3, Step::Prepare),
    (5, Step::Start),
    (8, Step::FloatingSeek(4.0)),
    (10, Step::Switch(Direction::Forward)),
    (14, Step::Hide),
    (16, Step::Resume),
    (18, Step::FloatingPause),
    (19, Step::FloatingPlay),
    (22, Step::Restore),
];

const LAST_TICK: u32 = 26;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Loading configuration")?;

    if !args.playlist.is_empty() {
        config.playback.playlist = args.playlist.iter().map(MediaReference::new).collect();
    }
    if let Some(speed) = args.speed {
        config.playback.default_speed = speed;
    }
    if args.loop_mode {
        config.playback.loop_enabled = true;
    }
    if args.auto_advance {
        config.playback.auto_advance = true;
    }
    if let Some(low_level) = args.low_level_backend {
        config.pip.use_low_level_frame_backend = low_level;
    }
    config.validate().context("Validating command line overrides")?;

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting pipsync v{}", env!("CARGO_PKG_VERSION"));

    let queue = EventQueue::new();
    let engine = Arc::new(SimulatedEngine::new(queue.sender()));
    let floating = Arc::new(SimulatedFloating::new());

    let mut controller = PlayerController::builder()
        .with_engine(engine.clone())
        .with_floating(floating.clone())
        .with_device(Arc::new(SimulatedDevice::default()))
        .with_config(config)
        .with_event_queue(queue)
        .build()?;

    let mut interval = tokio::time::interval(TICK);
    for tick in 0..=LAST_TICK {
        interval.tick().await;

        for (_, step) in SCRIPT.iter().filter(|(at, _)| *at == tick) {
            if let Err(e) = run_step(&mut controller, &floating, *step) {
                error!("Step {:?} failed: {}", step, e);
            }
        }

        engine.advance(MEDIA_STEP);
        controller.run_until_idle();
        controller.tick(Instant::now());
    }

    let state = controller.state();
    info!(
        "Finished at {} of {} ({:?})",
        format_timestamp(state.current_time),
        format_timestamp(state.duration),
        controller.lifecycle()
    );

    if args.dump_state {
        let report = DemoReport {
            playback: state,
            lifecycle: controller.lifecycle(),
            floating: floating.snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn run_step(controller: &mut PlayerController, floating: &SimulatedFloating, step: Step) -> pipsync::Result<()> {
    info!("Demo step: {:?}", step);

    match step {
        Step::Play => controller.play()?,
        Step::TapOverlay => {
            controller.tap_overlay(Instant::now());
        }
        Step::Prepare => controller.prepare()?,
        Step::Start => controller.start()?,
        Step::FloatingSeek(time) => floating.user_seek(
            time,
            Some(Box::new(move || info!("Floating seek to {} settled", format_timestamp(time)))),
        ),
        Step::Switch(direction) => {
            let media = controller.switch_item(direction)?;
            info!("Now playing {}", media);
        }
        Step::Hide => controller.hide(),
        Step::Resume => controller.resume(),
        Step::FloatingPause => floating.user_toggled(false),
        Step::FloatingPlay => floating.user_toggled(true),
        Step::Restore => floating.user_requested_restore(),
    }
    Ok(())
}
