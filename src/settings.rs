//! Game settings and difficulty presets
//!
//! Loaded once at round start; nothing in here changes while a round runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::{ms_to_ticks, per_tick};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Difficulty triple consumed at round start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Shortest word to spawn
    pub min_length: usize,
    /// Longest word to spawn
    pub max_length: usize,
    /// Initial downward speed of a fresh word (units/second)
    pub fall_speed: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::APPRENTICE
    }
}

impl Difficulty {
    pub const APPRENTICE: Self = Self {
        min_length: 3,
        max_length: 5,
        fall_speed: 120.0,
    };
    pub const SCHOLAR: Self = Self {
        min_length: 5,
        max_length: 7,
        fall_speed: 170.0,
    };
    pub const MASTER: Self = Self {
        min_length: 7,
        max_length: 10,
        fall_speed: 220.0,
    };

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "apprentice" | "easy" => Some(Self::APPRENTICE),
            "scholar" | "medium" => Some(Self::SCHOLAR),
            "master" | "hard" => Some(Self::MASTER),
            _ => None,
        }
    }

    /// Downward spawn velocity in units/tick
    pub fn fall_speed_per_tick(&self) -> f32 {
        per_tick(self.fall_speed)
    }
}

/// Physical behavior of a frozen block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeMode {
    /// Stays dynamic with a forced downward speed
    #[default]
    FastFall,
    /// Pinned in place as a static body
    Static,
}

/// Full round configuration (geometry, timings, thresholds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub difficulty: Difficulty,

    // === Play field ===
    pub field_width: f32,
    pub field_height: f32,
    /// Wall thickness; inner edges of the walls sit this far inside the field
    pub wall_thickness: f32,

    // === Blocks ===
    pub block_size: f32,
    /// Link stiffness (0-1, soft so chains sag)
    pub link_stiffness: f32,
    /// Gravity in units/tick²
    pub gravity: f32,
    /// Forced downward speed for frozen blocks (units/tick)
    pub frozen_fall_speed: f32,
    pub freeze_mode: FreezeMode,

    // === Spawning ===
    /// Gap between the top wall's inner edge and a fresh block's top edge
    pub spawn_gap: f32,
    /// Extra vertical offset per letter so chains cascade
    pub letter_drop: f32,
    /// Horizontal clearance kept between a fresh word and the side walls
    pub side_margin: f32,
    /// Max horizontal jitter of spawn velocity (units/tick)
    pub spawn_jitter: f32,
    /// Delay before the very first word (ms)
    pub initial_spawn_delay_ms: u32,
    /// Delay after an abandoned word before the next spawn (ms)
    pub respawn_delay_ms: u32,

    // === Termination ===
    /// A settled frozen block centered above this y ends the round
    pub game_over_line: f32,
    /// Vertical speed below which a block counts as settled (units/tick)
    pub settle_speed: f32,
    /// Frozen blocks closer than this to the top wall are ignored for word collisions
    pub spawn_clear_buffer: f32,
    /// Tolerance for the position-based boundary fallback
    pub boundary_proximity: f32,

    // === Scoring / effects ===
    pub points_per_letter: u64,
    pub explode_on_game_over: bool,
    pub explode_stagger_ms: u32,

    // === Word source ===
    pub max_word_length: usize,
    pub word_retries: u32,
    /// Recent-word set fill ratio (of candidates) that triggers eviction
    pub recent_fill_ratio: f32,
    /// Fraction of the recent set evicted (oldest first)
    pub recent_evict_fraction: f32,

    /// RNG seed for spawn placement and word choice
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),

            field_width: 800.0,
            field_height: 600.0,
            wall_thickness: 32.0,

            block_size: BLOCK_SIZE,
            link_stiffness: 0.1,
            gravity: 0.28,
            frozen_fall_speed: 12.0,
            freeze_mode: FreezeMode::FastFall,

            spawn_gap: 8.0,
            letter_drop: 2.0,
            side_margin: 8.0,
            spawn_jitter: 0.5,
            initial_spawn_delay_ms: 500,
            respawn_delay_ms: 500,

            game_over_line: 100.0,
            settle_speed: 0.5,
            spawn_clear_buffer: 100.0,
            boundary_proximity: 4.0,

            points_per_letter: 10,
            explode_on_game_over: true,
            explode_stagger_ms: 50,

            max_word_length: MAX_WORD_LENGTH,
            word_retries: 50,
            recent_fill_ratio: 0.75,
            recent_evict_fraction: 0.2,

            seed: 0x5eed_cafe,
        }
    }
}

impl GameConfig {
    /// Default config with a difficulty preset applied
    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("field_width", self.field_width),
            ("field_height", self.field_height),
            ("block_size", self.block_size),
            ("settle_speed", self.settle_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("wall_thickness", self.wall_thickness),
            ("gravity", self.gravity),
            ("frozen_fall_speed", self.frozen_fall_speed),
            ("spawn_gap", self.spawn_gap),
            ("letter_drop", self.letter_drop),
            ("side_margin", self.side_margin),
            ("spawn_jitter", self.spawn_jitter),
            ("game_over_line", self.game_over_line),
            ("spawn_clear_buffer", self.spawn_clear_buffer),
            ("boundary_proximity", self.boundary_proximity),
            ("difficulty.fall_speed", self.difficulty.fall_speed),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.inner_width() < self.block_size {
            return Err(ConfigError::Invalid("field too narrow for a single block".into()));
        }
        if self.inner_height() < self.block_size * 2.0 {
            return Err(ConfigError::Invalid("field too short".into()));
        }
        if !(0.0..=1.0).contains(&self.link_stiffness) {
            return Err(ConfigError::Invalid("link_stiffness must be in [0, 1]".into()));
        }
        let d = &self.difficulty;
        if d.min_length > d.max_length {
            return Err(ConfigError::Invalid(format!(
                "difficulty min_length {} exceeds max_length {}",
                d.min_length, d.max_length
            )));
        }
        if self.max_word_length < MIN_WORD_LENGTH {
            return Err(ConfigError::Invalid("max_word_length below 3".into()));
        }
        let in_unit = |v: f32| v > 0.0 && v <= 1.0;
        if !in_unit(self.recent_fill_ratio) || !in_unit(self.recent_evict_fraction) {
            return Err(ConfigError::Invalid("recent-word ratios must be in (0, 1]".into()));
        }
        Ok(())
    }

    /// Y of the top wall's inner edge
    pub fn top_edge(&self) -> f32 {
        self.wall_thickness
    }

    /// Y of the bottom wall's inner edge
    pub fn bottom_edge(&self) -> f32 {
        self.field_height - self.wall_thickness
    }

    pub fn left_edge(&self) -> f32 {
        self.wall_thickness
    }

    pub fn right_edge(&self) -> f32 {
        self.field_width - self.wall_thickness
    }

    pub fn inner_width(&self) -> f32 {
        self.right_edge() - self.left_edge()
    }

    pub fn inner_height(&self) -> f32 {
        self.bottom_edge() - self.top_edge()
    }

    /// Spawn y of a word's first block center
    pub fn spawn_y(&self) -> f32 {
        self.top_edge() + self.spawn_gap + self.block_size / 2.0
    }

    pub fn respawn_delay_ticks(&self) -> u64 {
        ms_to_ticks(self.respawn_delay_ms)
    }

    pub fn initial_spawn_delay_ticks(&self) -> u64 {
        ms_to_ticks(self.initial_spawn_delay_ms)
    }

    pub fn explode_stagger_ticks(&self) -> u64 {
        ms_to_ticks(self.explode_stagger_ms).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_name() {
        assert_eq!(Difficulty::from_name("Scholar"), Some(Difficulty::SCHOLAR));
        assert_eq!(Difficulty::from_name("hard"), Some(Difficulty::MASTER));
        assert_eq!(Difficulty::from_name("legendary"), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
        assert!(GameConfig::with_difficulty(Difficulty::MASTER).validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = GameConfig::from_json_str(
            r#"{ "difficulty": { "min_length": 4, "max_length": 6, "fall_speed": 90.0 }, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.difficulty.min_length, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.points_per_letter, 10);
    }

    #[test]
    fn test_inverted_difficulty_rejected() {
        let json = r#"{ "difficulty": { "min_length": 8, "max_length": 4, "fall_speed": 90.0 } }"#;
        assert!(matches!(
            GameConfig::from_json_str(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_overflowing_or_negative_tunables_rejected() {
        // 1e39 does not fit in an f32 and parses to infinity
        for field in [
            "spawn_jitter",
            "gravity",
            "frozen_fall_speed",
            "side_margin",
            "game_over_line",
            "spawn_gap",
        ] {
            for value in ["1e39", "-1.0"] {
                let json = format!(r#"{{ "{field}": {value} }}"#);
                assert!(
                    matches!(GameConfig::from_json_str(&json), Err(ConfigError::Invalid(_))),
                    "{field} = {value} accepted"
                );
            }
        }
        let nan = GameConfig {
            gravity: f32::NAN,
            ..GameConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_bad_json_is_json_error() {
        assert!(matches!(
            GameConfig::from_json_str("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_geometry_helpers() {
        let config = GameConfig::default();
        assert_eq!(config.top_edge(), 32.0);
        assert_eq!(config.bottom_edge(), 568.0);
        assert_eq!(config.spawn_y(), 60.0);
        assert_eq!(config.respawn_delay_ticks(), 30);
    }
}
