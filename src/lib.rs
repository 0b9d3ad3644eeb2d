//! Word Cascade - A falling-word typing game core
//!
//! Core modules:
//! - `sim`: Fixed-step simulation (word lifecycle, collision classification, game over)
//! - `settings`: Difficulty presets and data-driven game configuration

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, Difficulty, FreezeMode, GameConfig};

/// Game configuration constants
pub mod consts {
    /// Simulation ticks per second (velocities are expressed in units/tick)
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Letter block edge length
    pub const BLOCK_SIZE: f32 = 40.0;
    /// Block surface response
    pub const BLOCK_FRICTION: f32 = 0.1;
    pub const BLOCK_RESTITUTION: f32 = 0.3;
    pub const BLOCK_DENSITY: f32 = 0.001;

    /// How far boundary walls extend outward past their inner edge
    pub const BOUNDARY_DEPTH: f32 = 1000.0;

    /// Hard cap on body speed (units/tick), keeps fast-falling blocks from tunnelling
    pub const MAX_BODY_SPEED: f32 = 30.0;

    /// Hard bounds on generated word length
    pub const MIN_WORD_LENGTH: usize = 3;
    pub const MAX_WORD_LENGTH: usize = 15;
}

/// Convert a per-second speed into units per simulation tick
#[inline]
pub fn per_tick(units_per_second: f32) -> f32 {
    units_per_second / consts::TICKS_PER_SECOND as f32
}

/// Convert milliseconds into whole simulation ticks (rounded up)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u64 {
    (ms as u64 * consts::TICKS_PER_SECOND as u64).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_tick() {
        assert!((per_tick(120.0) - 2.0).abs() < 0.0001);
    }

    #[test]
    fn test_ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(500), 30);
        assert_eq!(ms_to_ticks(10), 1);
        assert_eq!(ms_to_ticks(0), 0);
    }
}
