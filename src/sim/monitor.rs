//! Termination monitor
//!
//! Runs before every physics step. The round ends when the highest block is
//! frozen, sits above the game-over line, and has come to rest. Requiring the
//! settle check keeps a block that is merely passing through from ending the
//! round.

use super::registry::BodyRegistry;
use super::state::GameOverReason;
use super::world::PhysicsWorld;
use crate::settings::GameConfig;

#[derive(Debug, Clone, Copy)]
pub struct TerminationMonitor {
    /// Block centers at or above this y (smaller y) are "too high"
    pub line_y: f32,
    /// Max |vy| (units/tick) for a block to count as settled
    pub settle_speed: f32,
}

impl TerminationMonitor {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            line_y: config.game_over_line,
            settle_speed: config.settle_speed,
        }
    }

    pub fn check<W: PhysicsWorld>(&self, registry: &BodyRegistry<W>) -> Option<GameOverReason> {
        let highest = registry.find_highest_block()?;
        let record = registry.block(highest)?;
        if !record.frozen {
            return None;
        }
        let pos = registry.position(highest)?;
        let vel = registry.velocity(highest)?;
        if pos.y <= self.line_y && vel.y.abs() < self.settle_speed {
            log::info!(
                "Block {:?} settled above the line at y={:.1} (vy={:.2})",
                highest,
                pos.y,
                vel.y
            );
            Some(GameOverReason::SettledAboveLine)
        } else {
            None
        }
    }
}
