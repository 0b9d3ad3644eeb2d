//! Word lifecycle controller
//!
//! Owns the single active word. Spawns a linked chain of blocks when idle,
//! advances on correct keys, freezes the remaining chain on a wrong key, and
//! keeps the respawn cooldown in its own task queue.
//!
//! State machine: `Cooldown -> Idle -> Active -> (Idle | Cooldown)`.

use glam::Vec2;
use rand::Rng;

use super::registry::BodyRegistry;
use super::schedule::{ScheduledTask, Scheduler};
use super::state::{BlockHandle, GameEvent, Word, WordId};
use super::world::PhysicsWorld;
use crate::settings::{FreezeMode, GameConfig};

/// Controller state
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    /// Ready to spawn on the next tick
    Idle,
    /// A word is accepting input
    Active(Word),
    /// Waiting for `EndCooldown` before spawning again
    Cooldown,
}

/// Result of feeding one key to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a single a-z letter, or no active word
    Ignored,
    /// Front block destroyed; `completed` when that was the last one
    Correct { completed: bool },
    /// Remaining chain frozen
    Wrong,
}

/// Normalize raw input to a lowercase a-z letter
pub fn normalize_key(key: char) -> Option<char> {
    let key = key.to_ascii_lowercase();
    key.is_ascii_lowercase().then_some(key)
}

pub struct WordController {
    state: ControllerState,
    scheduler: Scheduler,
    next_word_id: u32,
    config: GameConfig,
}

impl WordController {
    /// Starts in cooldown; the first spawn waits for the initial delay
    pub fn new(config: &GameConfig) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0, config.initial_spawn_delay_ticks(), ScheduledTask::EndCooldown);
        Self {
            state: ControllerState::Cooldown,
            scheduler,
            next_word_id: 1,
            config: config.clone(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn active_word(&self) -> Option<&Word> {
        match &self.state {
            ControllerState::Active(word) => Some(word),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ControllerState::Idle)
    }

    pub fn is_in_active_word(&self, block: BlockHandle) -> bool {
        self.active_word().is_some_and(|w| w.contains(block))
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn schedule(&mut self, now: u64, delay: u64, task: ScheduledTask) {
        self.scheduler.schedule(now, delay, task);
    }

    /// Fire due tasks. Cooldown ends are handled here; everything else is
    /// handed back to the caller.
    pub fn run_due(&mut self, now: u64) -> Vec<ScheduledTask> {
        let mut rest = Vec::new();
        for task in self.scheduler.drain_due(now) {
            match task {
                ScheduledTask::EndCooldown => {
                    if self.state == ControllerState::Cooldown {
                        self.state = ControllerState::Idle;
                    }
                }
                other => rest.push(other),
            }
        }
        rest
    }

    /// Cancel pending tasks and drop the active word reference (round end)
    pub fn shutdown(&mut self) -> usize {
        self.state = ControllerState::Idle;
        self.scheduler.cancel_all()
    }

    /// Left-most block center for a word of `len` letters, uniformly random
    /// within the range that keeps the whole word inside the side margins
    pub fn spawn_x(&self, len: usize, rng: &mut impl Rng) -> f32 {
        let c = &self.config;
        let span = len.saturating_sub(1) as f32 * c.block_size;
        let min_x = c.left_edge() + c.side_margin + c.block_size / 2.0;
        let max_x = c.right_edge() - c.side_margin - c.block_size / 2.0 - span;
        if max_x <= min_x {
            // Too wide for the margins: center it
            return (c.left_edge() + c.right_edge()) / 2.0 - span / 2.0;
        }
        rng.random_range(min_x..=max_x)
    }

    /// Spawn a chain for `text`. No-op (returns false) unless idle. A failed
    /// block creation tears down the partial chain and leaves the controller
    /// idle so the next tick retries.
    pub fn spawn_word<W: PhysicsWorld>(
        &mut self,
        text: &str,
        upcoming: Option<String>,
        registry: &mut BodyRegistry<W>,
        rng: &mut impl Rng,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        let letters: Vec<char> = text.chars().collect();
        if letters.is_empty() {
            return false;
        }

        let id = WordId(self.next_word_id);
        self.next_word_id += 1;

        let c = &self.config;
        let start_x = self.spawn_x(letters.len(), rng);
        let start_y = c.spawn_y();
        let fall = c.difficulty.fall_speed_per_tick();
        let jitter = c.spawn_jitter.abs();

        let group = registry.new_spawn_group();
        let mut blocks: Vec<BlockHandle> = Vec::with_capacity(letters.len());
        for (i, &letter) in letters.iter().enumerate() {
            let pos = Vec2::new(
                start_x + i as f32 * c.block_size,
                start_y + i as f32 * c.letter_drop,
            );
            let Some(block) = registry.create_block(pos, letter, id, Some(group)) else {
                log::warn!("Spawn of '{text}' aborted at letter {i}");
                for created in blocks {
                    registry.destroy_body(created);
                }
                return false;
            };
            if let Some(&prev) = blocks.last() {
                registry.create_constraint(prev, block);
            }
            let vx = rng.random_range(-jitter..=jitter);
            let vy = fall * rng.random_range(0.9..=1.1);
            registry.set_velocity(block, Vec2::new(vx, vy));
            blocks.push(block);
        }

        let Some(word) = Word::new(id, text, blocks.clone()) else {
            for created in blocks {
                registry.destroy_body(created);
            }
            return false;
        };

        log::info!("Spawned word '{text}' ({} blocks) at x={start_x:.0}", word.len());
        events.push(GameEvent::WordSpawned {
            text: text.to_string(),
            blocks: blocks.clone(),
            upcoming,
        });
        if let Some(active) = word.active_block() {
            events.push(GameEvent::WordAdvance {
                remaining: word.remaining_text(),
                active,
            });
        }
        self.state = ControllerState::Active(word);
        true
    }

    /// Feed one keypress
    pub fn handle_key<W: PhysicsWorld>(
        &mut self,
        key: char,
        now: u64,
        registry: &mut BodyRegistry<W>,
        events: &mut Vec<GameEvent>,
    ) -> KeyOutcome {
        let Some(key) = normalize_key(key) else {
            return KeyOutcome::Ignored;
        };
        let Some(expected) = self.active_word().and_then(Word::expected) else {
            return KeyOutcome::Ignored;
        };
        if key == expected.to_ascii_lowercase() {
            self.correct_key(registry, events)
        } else {
            log::debug!("Wrong key '{key}', expected '{expected}'");
            self.freeze_active_word(now, registry, events);
            KeyOutcome::Wrong
        }
    }

    fn correct_key<W: PhysicsWorld>(
        &mut self,
        registry: &mut BodyRegistry<W>,
        events: &mut Vec<GameEvent>,
    ) -> KeyOutcome {
        let ControllerState::Active(word) = &mut self.state else {
            return KeyOutcome::Ignored;
        };
        let Some((_, block)) = word.pop_front() else {
            return KeyOutcome::Ignored;
        };
        if let Some(position) = registry.destroy_body(block) {
            events.push(GameEvent::BlockDestroyed { block, position });
        }
        events.push(GameEvent::ScoreIncrement {
            points: self.config.points_per_letter,
        });

        match word.active_block() {
            Some(active) => {
                events.push(GameEvent::WordAdvance {
                    remaining: word.remaining_text(),
                    active,
                });
                KeyOutcome::Correct { completed: false }
            }
            None => {
                log::info!("Word {:?} cleared", word.id);
                self.state = ControllerState::Idle;
                KeyOutcome::Correct { completed: true }
            }
        }
    }

    /// Freeze one block: flag it, release its spawn group, then either force a
    /// fast fall (keeping horizontal velocity) or pin it, per `freeze_mode`.
    /// False if missing or already frozen.
    pub fn freeze_block<W: PhysicsWorld>(
        &mut self,
        block: BlockHandle,
        registry: &mut BodyRegistry<W>,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        match registry.block_mut(block) {
            Some(record) if !record.frozen => record.frozen = true,
            _ => return false,
        }
        registry.leave_spawn_group(block);
        match self.config.freeze_mode {
            FreezeMode::FastFall => {
                let velocity = registry.velocity(block).unwrap_or(Vec2::ZERO);
                registry.set_velocity(block, Vec2::new(velocity.x, self.config.frozen_fall_speed));
            }
            FreezeMode::Static => {
                registry.mark_static(block);
            }
        }
        let position = registry
            .position(block)
            .or_else(|| registry.block(block).map(|b| b.last_position))
            .unwrap_or(Vec2::ZERO);
        events.push(GameEvent::BlockFrozen { block, position });
        true
    }

    /// Abandon the active word: freeze every remaining block and start the
    /// respawn cooldown. False if no word was active.
    pub fn freeze_active_word<W: PhysicsWorld>(
        &mut self,
        now: u64,
        registry: &mut BodyRegistry<W>,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let ControllerState::Active(word) = &mut self.state else {
            return false;
        };
        let word_id = word.id;
        let blocks = word.drain_blocks();
        self.state = ControllerState::Cooldown;
        self.scheduler.schedule(
            now,
            self.config.respawn_delay_ticks(),
            ScheduledTask::EndCooldown,
        );
        log::info!("Word {word_id:?} frozen with {} blocks left", blocks.len());
        for block in blocks {
            self.freeze_block(block, registry, events);
        }
        true
    }
}
