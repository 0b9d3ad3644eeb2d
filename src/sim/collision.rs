//! Collision classification
//!
//! Turns the engine's "contact started" pairs into game decisions: freeze the
//! active word, catch a stray block that slipped past, or end the round.
//!
//! Walls are recognised by the identity assigned at creation. Position
//! proximity (a static, untagged body at the wall's edge) is only a fallback
//! for bodies created outside the registry.

use super::lifecycle::WordController;
use super::registry::BodyRegistry;
use super::state::{BlockHandle, Boundary, GameEvent, GameOverReason};
use super::world::{BodyId, CollisionPair, PhysicsWorld};
use crate::settings::GameConfig;

/// What a single contact means for the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// A block of the active word reached the bottom wall
    BottomActive,
    /// An unfrozen block outside the active word reached the bottom wall
    BottomStray(BlockHandle),
    /// The active word struck frozen debris below the spawn area
    WordHitFrozen,
    /// A frozen block touched the top wall
    TopFrozen,
}

#[derive(Debug, Clone)]
pub struct CollisionClassifier {
    top_edge: f32,
    bottom_edge: f32,
    /// Frozen blocks above this y are still passing through the spawn area
    spawn_clear_y: f32,
    proximity: f32,
}

impl CollisionClassifier {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            top_edge: config.top_edge(),
            bottom_edge: config.bottom_edge(),
            spawn_clear_y: config.top_edge() + config.spawn_clear_buffer,
            proximity: config.boundary_proximity,
        }
    }

    fn is_wall<W: PhysicsWorld>(
        &self,
        id: BodyId,
        wall: Boundary,
        registry: &BodyRegistry<W>,
    ) -> bool {
        if let Some(tagged) = registry.boundary(id) {
            return tagged == wall;
        }
        if registry.block(id).is_some() || registry.is_static(id) != Some(true) {
            return false;
        }
        let Some(pos) = registry.position(id) else {
            return false;
        };
        match wall {
            Boundary::Bottom => pos.y >= self.bottom_edge - self.proximity,
            Boundary::Top => pos.y <= self.top_edge + self.proximity,
            Boundary::Left | Boundary::Right => false,
        }
    }

    fn is_frozen<W: PhysicsWorld>(id: BodyId, registry: &BodyRegistry<W>) -> bool {
        registry.block(id).is_some_and(|b| b.frozen)
    }

    /// Classify one pair; `None` when it means nothing (or data is missing)
    pub fn classify<W: PhysicsWorld>(
        &self,
        pair: &CollisionPair,
        registry: &BodyRegistry<W>,
        controller: &WordController,
    ) -> Option<ContactKind> {
        if pair.a == pair.b {
            return None;
        }
        let orientations = [(pair.a, pair.b), (pair.b, pair.a)];

        // Bottom wall vs real block
        for (wall, block) in orientations {
            if !self.is_wall(wall, Boundary::Bottom, registry) {
                continue;
            }
            let Some(record) = registry.block(block) else {
                continue;
            };
            if controller.is_in_active_word(block) {
                return Some(ContactKind::BottomActive);
            }
            if !record.frozen {
                return Some(ContactKind::BottomStray(block));
            }
        }

        // Active word vs frozen debris that has cleared the spawn area
        for (active, other) in orientations {
            if !controller.is_in_active_word(active) || !Self::is_frozen(other, registry) {
                continue;
            }
            if registry.block(active).is_none() {
                continue;
            }
            let Some(pos) = registry.position(other) else {
                continue;
            };
            if pos.y > self.spawn_clear_y {
                return Some(ContactKind::WordHitFrozen);
            }
        }

        // Top wall vs frozen block
        for (wall, block) in orientations {
            if self.is_wall(wall, Boundary::Top, registry) && Self::is_frozen(block, registry) {
                return Some(ContactKind::TopFrozen);
            }
        }

        None
    }

    /// Process one "collision started" batch in order. Returns the game-over
    /// reason as soon as one is found; remaining pairs are skipped.
    pub fn handle_batch<W: PhysicsWorld>(
        &self,
        pairs: &[CollisionPair],
        now: u64,
        registry: &mut BodyRegistry<W>,
        controller: &mut WordController,
        events: &mut Vec<GameEvent>,
    ) -> Option<GameOverReason> {
        for pair in pairs {
            let Some(kind) = self.classify(pair, registry, controller) else {
                continue;
            };
            log::debug!("Contact {:?}-{:?}: {kind:?}", pair.a, pair.b);
            match kind {
                ContactKind::BottomActive | ContactKind::WordHitFrozen => {
                    controller.freeze_active_word(now, registry, events);
                }
                ContactKind::BottomStray(block) => {
                    controller.freeze_block(block, registry, events);
                }
                ContactKind::TopFrozen => return Some(GameOverReason::TopCollision),
            }
        }
        None
    }
}
