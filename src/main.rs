//! Headless engine driver.
//!
//! Runs the simulation without a windowing host: smoke-runs a level with
//! neutral input, verifies level files, plays back demo recordings and
//! prints the profile table. The graphical host links the library crate
//! and drives the same `Session`/`tick` surface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use ridge_runner::consts::{VIEWPORT_H, VIEWPORT_W};
use ridge_runner::profile::ProfileStore;
use ridge_runner::render::FrameBuffer;
use ridge_runner::sim::clock::{FixedPump, MeasuredPump};
use ridge_runner::sim::demo::DemoRecording;
use ridge_runner::sim::level_file;
use ridge_runner::sim::tick::{start_demo, start_game};
use ridge_runner::sim::{Phase, Session, SessionConfig, TickInput, tick};

#[derive(Parser, Debug)]
#[command(name = "ridge-runner", version, about = "Side-scrolling terrain runner, headless driver")]
struct Options {
    /// Start level (1-10)
    #[arg(short, long, default_value_t = 1)]
    level: u32,

    /// Load this level file instead of generating terrain
    #[arg(short = 'f', long)]
    level_file: Option<PathBuf>,

    /// Only parse and validate the level file, then exit
    #[arg(long, requires = "level_file")]
    check: bool,

    /// Play back a recorded demo file
    #[arg(short, long, conflicts_with_all = ["level_file", "check"])]
    demo: Option<PathBuf>,

    /// Write the run's demo recording here when it covers the level
    #[arg(long)]
    record: Option<PathBuf>,

    /// User profile name
    #[arg(short, long, default_value = "")]
    user: String,

    /// Profile store path
    #[arg(long, default_value = "profiles.json")]
    profiles: PathBuf,

    /// Print the score table and exit
    #[arg(long)]
    scores: bool,

    /// Trainer mode: no profile writes, no focus pausing
    #[arg(short, long)]
    trainer: bool,

    /// Classic flat palettes
    #[arg(long)]
    classic: bool,

    /// Seed gameplay from entropy instead of the fixed default
    #[arg(long)]
    nondeterministic: bool,

    /// Pace the run in real time at this frame rate instead of
    /// free-running
    #[arg(long)]
    fps: Option<u32>,

    /// Scale the scroll distance by measured frame time instead of
    /// running catch-up ticks
    #[arg(long, requires = "fps")]
    speed_correction: bool,

    /// Stop after this many ticks
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Options::parse();

    if opts.scores {
        return print_scores(&opts.profiles);
    }
    if opts.check {
        return check_level(opts.level_file.as_deref().context("no level file")?);
    }

    let cfg = SessionConfig {
        start_level: opts.level,
        level_file: opts.level_file.clone(),
        trainer: opts.trainer,
        classic: opts.classic,
        nondeterministic: opts.nondeterministic,
        speed_correction: opts.speed_correction,
        user: opts.user.clone(),
        ..Default::default()
    };
    let profiles = if opts.trainer {
        ProfileStore::in_memory()
    } else {
        ProfileStore::load(&opts.profiles)
    };
    let mut session = Session::new(cfg, profiles);
    let mut fb = FrameBuffer::new(VIEWPORT_W, VIEWPORT_H);

    if let Some(path) = &opts.demo {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read demo {}", path.display()))?;
        let recording = DemoRecording::parse(&text)?;
        if !start_demo(&mut session, recording) {
            bail!("demo {} does not cover its level", path.display());
        }
    } else if !start_game(&mut session) {
        bail!("could not start level {}", opts.level);
    }

    // Wall-clock pacing only when asked for; the default free-runs on
    // the fixed pump so batch runs finish immediately
    let pump = opts.fps.map(|fps| {
        MeasuredPump::with_frame(
            Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            opts.speed_correction,
        )
    });
    let outcome = run(&mut session, &mut fb, opts.max_ticks, pump);
    log::info!(
        "finished after {} ticks: {outcome}, score {}",
        session.tick_count,
        session.score
    );

    if let Some(path) = &opts.record
        && let Some(rec) = session.recorder.take()
    {
        let final_offset = session.terrain.final_offset(session.cfg.viewport_w);
        if rec.recording.covers(final_offset) {
            std::fs::write(path, rec.recording.serialize())
                .with_context(|| format!("write demo {}", path.display()))?;
            log::info!("demo written to {}", path.display());
        } else {
            log::warn!("run did not cover the level, demo discarded");
        }
    }
    Ok(())
}

/// Pump neutral-input ticks until the session settles or the budget runs
/// out, paced by the measured pump when one is given. Returns a short
/// outcome label for the log line.
fn run(
    session: &mut Session,
    fb: &mut FrameBuffer,
    max_ticks: u64,
    mut pump: Option<MeasuredPump>,
) -> &'static str {
    // Leave the title screen
    let go = TickInput {
        action: true,
        ..Default::default()
    };
    if session.phase == Phase::Start {
        tick(session, &TickInput::default(), fb);
    }
    if session.phase == Phase::Title {
        tick(session, &go, fb);
    }

    let neutral = TickInput::default();
    let mut budget = max_ticks;
    while budget > 0 {
        let step = match pump.as_mut() {
            Some(p) => p.poll(),
            None => FixedPump.step(),
        };
        if step.ticks == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }
        session.speed_scale = step.dx_scale;
        for _ in 0..(step.ticks as u64).min(budget) {
            match session.phase {
                Phase::LevelDone => return "level complete",
                Phase::LevelFail => return "craft destroyed",
                Phase::Title | Phase::Score => return "ended",
                _ => tick(session, &neutral, fb),
            }
            budget -= 1;
        }
    }
    "tick budget exhausted"
}

fn check_level(path: &std::path::Path) -> Result<()> {
    let level = level_file::load_level(path, VIEWPORT_W, VIEWPORT_H)?;
    println!(
        "{}: {} columns, {} overrides, final offset {}",
        path.display(),
        level.terrain.len(),
        level.overrides.len(),
        level.terrain.final_offset(VIEWPORT_W)
    );
    Ok(())
}

fn print_scores(path: &std::path::Path) -> Result<()> {
    let store = ProfileStore::load(path);
    let rows = store.all_by_score();
    if rows.is_empty() {
        println!("no profiles yet");
        return Ok(());
    }
    for (name, p) in rows {
        println!(
            "{name:<16} score {:>7}  level {:>2}  completed {}",
            p.score, p.level, p.completed
        );
    }
    Ok(())
}
