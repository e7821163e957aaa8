//! Traffic Racer headless entry point
//!
//! Runs one autopiloted session for a fixed number of ticks, then writes the
//! high score table and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use traffic_racer::sim::{GameEvent, TickInput};
use traffic_racer::{Session, Settings};

#[derive(Parser, Debug)]
#[command(name = "traffic-racer", about = "Headless lane-dodging racer")]
struct Args {
    /// Settings file (JSON)
    #[arg(long, default_value = "traffic_racer.json")]
    config: PathBuf,

    /// Run seed (overrides the settings file)
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 5_000)]
    ticks: u64,

    /// High score file (overrides the settings file)
    #[arg(long)]
    scores: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    // Panics (including ones contained inside background jobs) go to the log
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        log::error!("thread '{}' {info}", thread.name().unwrap_or("<unnamed>"));
    }));
    let args = Args::parse();
    log::info!("Traffic Racer (headless) starting...");

    let mut settings = Settings::load_or_default(&args.config);
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(scores) = args.scores {
        settings.score_file = scores;
    }

    match run(&settings, args.ticks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings, ticks: u64) -> traffic_racer::Result<()> {
    let mut session = Session::new(settings)?;
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };

    for _ in 0..ticks {
        for event in session.step(&input) {
            match event {
                GameEvent::LevelUp(level) => log::info!("Level {level}"),
                GameEvent::Crash { lives_left } => log::info!("Crash! {lives_left} lives left"),
                GameEvent::GameOver { score, reason } => {
                    log::info!("Game over ({reason:?}) with score {score}")
                }
                other => log::debug!("{other:?}"),
            }
        }
        if session.is_over() {
            break;
        }
    }

    let state = &session.state;
    log::info!(
        "Ran {} ticks: score {}, level {}, lives {}, best streak {}",
        state.tick,
        state.score.current,
        state.level,
        state.lives,
        state.score.max_streak
    );

    let scores = session.shutdown()?;
    log::info!("High scores: {:?}", scores.top_k());
    Ok(())
}
