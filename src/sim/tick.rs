//! Fixed timestep round driver
//!
//! One call to `tick` is one logical frame: scheduled tasks, keyboard input,
//! idle spawn, termination check (before the physics step), physics step,
//! collision classification, and the out-of-field sweep. Everything runs on
//! one thread in that order, so input and collisions never interleave
//! mid-mutation.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::CollisionClassifier;
use super::lifecycle::{KeyOutcome, WordController};
use super::monitor::TerminationMonitor;
use super::registry::BodyRegistry;
use super::schedule::ScheduledTask;
use super::state::{BlockHandle, GameEvent, GameOverReason, RoundPhase};
use super::words::WordSource;
use super::world::PhysicsWorld;
use crate::settings::GameConfig;

/// Input collected for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Keys pressed since the previous tick, in order
    pub keys: Vec<char>,
}

impl TickInput {
    pub fn key(key: char) -> Self {
        Self { keys: vec![key] }
    }
}

/// Everything one round owns. Built at round start, torn down at round end.
pub struct Round<W: PhysicsWorld> {
    pub config: GameConfig,
    pub phase: RoundPhase,
    pub score: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub registry: BodyRegistry<W>,
    pub controller: WordController,
    pub words: WordSource,
    pub classifier: CollisionClassifier,
    pub monitor: TerminationMonitor,
    rng: Pcg32,
    events: Vec<GameEvent>,
    reason: Option<GameOverReason>,
}

impl<W: PhysicsWorld> Round<W> {
    /// New round over the built-in word list
    pub fn new(world: W, config: GameConfig) -> Self {
        let words = WordSource::new(&config);
        Self::with_word_source(world, config, words)
    }

    pub fn with_word_source(world: W, config: GameConfig, words: WordSource) -> Self {
        let mut registry = BodyRegistry::new(world, &config);
        let walls = registry.create_boundaries(&config);
        if walls < 4 {
            log::warn!("Only {walls} of 4 boundaries created");
        }
        log::info!(
            "Round started: words {}..={}, fall speed {}, seed {}",
            config.difficulty.min_length,
            config.difficulty.max_length,
            config.difficulty.fall_speed,
            config.seed
        );
        Self {
            controller: WordController::new(&config),
            classifier: CollisionClassifier::new(&config),
            monitor: TerminationMonitor::new(&config),
            rng: Pcg32::seed_from_u64(config.seed),
            config,
            phase: RoundPhase::Playing,
            score: 0,
            time_ticks: 0,
            registry,
            words,
            events: Vec::new(),
            reason: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase == RoundPhase::GameOver
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.reason
    }

    /// Pending events, oldest first
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Spawn a word if the round is live and no word is active
    pub fn spawn_next_word(&mut self) -> bool {
        if self.is_over() || !self.controller.is_idle() {
            return false;
        }
        let d = self.config.difficulty;
        let text = self.words.next_word(d.min_length, d.max_length);
        let upcoming = self.words.peek_next_word().map(str::to_string);
        self.controller.spawn_word(
            &text,
            upcoming,
            &mut self.registry,
            &mut self.rng,
            &mut self.events,
        )
    }

    /// Feed one keypress (ignored once the round is over)
    pub fn press_key(&mut self, key: char) -> KeyOutcome {
        if self.is_over() {
            return KeyOutcome::Ignored;
        }
        let outcome =
            self.controller
                .handle_key(key, self.time_ticks, &mut self.registry, &mut self.events);
        if let KeyOutcome::Correct { .. } = outcome {
            self.score += self.config.points_per_letter;
        }
        outcome
    }

    /// Transition to `GameOver`. Cancels pending tasks, queues the explosion
    /// sequence and emits `RoundOver` exactly once. Returns false if the round
    /// was already over.
    pub fn end_round(&mut self, reason: GameOverReason) -> bool {
        if self.is_over() {
            return false;
        }
        self.phase = RoundPhase::GameOver;
        self.reason = Some(reason);
        let cancelled = self.controller.shutdown();
        log::info!(
            "Round over ({reason:?}) at tick {} with score {} ({cancelled} tasks cancelled)",
            self.time_ticks,
            self.score
        );

        if self.config.explode_on_game_over {
            let stagger = self.config.explode_stagger_ticks();
            let doomed: Vec<BlockHandle> = self
                .registry
                .blocks()
                .map(|b| b.body)
                .filter(|&b| self.registry.is_static(b) == Some(false))
                .collect();
            for (i, block) in doomed.into_iter().enumerate() {
                self.controller.schedule(
                    self.time_ticks,
                    (i as u64 + 1) * stagger,
                    ScheduledTask::Explode(block),
                );
            }
        }

        self.events.push(GameEvent::RoundOver {
            final_score: self.score,
            reason,
        });
        true
    }

    /// Cancel everything and remove every body this round created
    pub fn teardown(&mut self) {
        let cancelled = self.controller.shutdown();
        self.registry.destroy_all();
        log::info!("Round torn down ({cancelled} tasks cancelled)");
    }

    fn explode(&mut self, block: BlockHandle) {
        if let Some(position) = self.registry.destroy_body(block) {
            self.events.push(GameEvent::BlockExploded { block, position });
        }
    }

    /// Destroy blocks that tunnelled out of the field
    fn sweep_escaped(&mut self) {
        for block in self.registry.escaped_blocks(&self.config) {
            if self.controller.is_in_active_word(block) {
                self.controller.freeze_active_word(
                    self.time_ticks,
                    &mut self.registry,
                    &mut self.events,
                );
            }
            if let Some(position) = self.registry.destroy_body(block) {
                log::debug!("Block {block:?} left the field at {position}");
                self.events.push(GameEvent::BlockDestroyed { block, position });
            }
        }
    }
}

/// Advance the round by one fixed timestep
pub fn tick<W: PhysicsWorld>(round: &mut Round<W>, input: &TickInput) {
    round.time_ticks += 1;
    let now = round.time_ticks;

    // Scheduled tasks (cooldown ends are consumed by the controller)
    for task in round.controller.run_due(now) {
        if let ScheduledTask::Explode(block) = task {
            round.explode(block);
        }
    }

    // Nothing but the explosion sequence runs after game over
    if round.is_over() {
        return;
    }

    for &key in &input.keys {
        round.press_key(key);
    }

    if round.controller.is_idle() {
        round.spawn_next_word();
    }

    // Before-step hook
    if let Some(reason) = round.monitor.check(&round.registry) {
        round.end_round(reason);
        return;
    }

    let pairs = round.registry.step();
    if let Some(reason) = round.classifier.handle_batch(
        &pairs,
        now,
        &mut round.registry,
        &mut round.controller,
        &mut round.events,
    ) {
        round.end_round(reason);
        return;
    }

    round.sweep_escaped();
}
