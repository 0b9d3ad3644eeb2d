//! Word Cascade headless demo
//!
//! Plays one round against the rapier2d physics world with an autopilot
//! typist, logging events as they happen.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use word_cascade::consts::*;
use word_cascade::sim::{RapierWorld, GameEvent, Round, TickInput, normalize_key, tick};
use word_cascade::{Difficulty, GameConfig};

/// Falling-word typing game, played headlessly by an autopilot.
#[derive(Debug, Parser)]
#[command(name = "word-cascade", version)]
struct Args {
    /// Difficulty preset: apprentice, scholar or master (easy/medium/hard also accepted)
    #[arg(short, long, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,

    /// RNG seed; overrides the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON config file (missing fields use defaults)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Probability that the autopilot presses the right key
    #[arg(long, default_value = "0.92", value_name = "P")]
    accuracy: f64,

    /// Ticks between autopilot keypresses
    #[arg(long, default_value = "10", value_name = "TICKS")]
    typing_interval: u64,

    /// Give up after this many ticks even if the round is still live
    #[arg(long, default_value = "36000", value_name = "TICKS")]
    max_ticks: u64,

    /// Pace ticks against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_name(s).ok_or_else(|| format!("unknown difficulty '{s}'"))
}

/// Presses the expected letter on a fixed cadence, sometimes fumbling
struct Autopilot {
    rng: Pcg32,
    accuracy: f64,
    interval: u64,
}

impl Autopilot {
    fn new(seed: u64, accuracy: f64, interval: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0x7479_7065),
            accuracy,
            interval: interval.max(1),
        }
    }

    fn input(&mut self, round: &Round<RapierWorld>) -> TickInput {
        if round.time_ticks % self.interval != 0 {
            return TickInput::default();
        }
        let Some(expected) = round
            .controller
            .active_word()
            .and_then(|w| w.expected())
            .and_then(normalize_key)
        else {
            return TickInput::default();
        };
        if self.rng.random_bool(self.accuracy) {
            return TickInput::key(expected);
        }
        let offset = self.rng.random_range(1..26u8);
        let wrong = (b'a' + (expected as u8 - b'a' + offset) % 26) as char;
        TickInput::key(wrong)
    }
}

#[derive(Debug, Default)]
struct Tally {
    words: u32,
    letters: u32,
    frozen: u32,
}

fn record(event: &GameEvent, tally: &mut Tally) {
    match event {
        GameEvent::WordSpawned { text, upcoming, .. } => {
            tally.words += 1;
            log::info!(
                "Word '{text}' (next: {})",
                upcoming.as_deref().unwrap_or("-")
            );
        }
        GameEvent::WordAdvance { remaining, .. } => log::debug!("Remaining '{remaining}'"),
        GameEvent::ScoreIncrement { points } => {
            tally.letters += 1;
            log::debug!("+{points}");
        }
        GameEvent::BlockFrozen { block, position } => {
            tally.frozen += 1;
            log::debug!("Frozen {block:?} at {position}");
        }
        GameEvent::BlockDestroyed { block, position } => {
            log::debug!("Destroyed {block:?} at {position}");
        }
        GameEvent::BlockExploded { block, position } => {
            log::debug!("Exploded {block:?} at {position}");
        }
        GameEvent::RoundOver {
            final_score,
            reason,
        } => log::info!("Round over ({reason:?}), final score {final_score}"),
    }
}

fn step(round: &mut Round<RapierWorld>, pilot: &mut Autopilot, tally: &mut Tally) {
    let input = pilot.input(round);
    tick(round, &input);
    for event in round.drain_events() {
        record(&event, tally);
    }
}

/// Round over and the explosion sequence has played out, or out of time
fn finished(round: &Round<RapierWorld>, max_ticks: u64) -> bool {
    (round.is_over() && round.controller.scheduler().is_empty()) || round.time_ticks >= max_ticks
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.accuracy) {
        bail!("--accuracy must be within 0..=1, got {}", args.accuracy);
    }

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("invalid configuration")?;

    log::info!("Word Cascade (headless) starting...");
    let mut pilot = Autopilot::new(config.seed, args.accuracy, args.typing_interval);
    let mut round = Round::new(RapierWorld::new(config.gravity), config);
    let mut tally = Tally::default();

    if args.realtime {
        let mut last = Instant::now();
        let mut accumulator = 0.0f32;
        while !finished(&round, args.max_ticks) {
            let now = Instant::now();
            accumulator += (now - last).as_secs_f32().min(0.1);
            last = now;

            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                step(&mut round, &mut pilot, &mut tally);
                accumulator -= SIM_DT;
                substeps += 1;
            }
            std::thread::sleep(Duration::from_secs_f32(SIM_DT / 2.0));
        }
    } else {
        while !finished(&round, args.max_ticks) {
            step(&mut round, &mut pilot, &mut tally);
        }
    }

    let seconds = round.time_ticks as f32 * SIM_DT;
    if !round.is_over() {
        log::info!("Tick limit reached with the round still live");
    }
    round.teardown();

    println!(
        "score {} | {} words, {} letters typed, {} blocks frozen | {:.1}s simulated",
        round.score, tally.words, tally.letters, tally.frozen, seconds
    );
    Ok(())
}
