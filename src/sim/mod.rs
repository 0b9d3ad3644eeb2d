//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod engine;
pub mod lifecycle;
pub mod monitor;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod tick;
pub mod words;
pub mod world;

pub use collision::{CollisionClassifier, ContactKind};
pub use engine::RapierWorld;
pub use lifecycle::{ControllerState, KeyOutcome, WordController, normalize_key};
pub use monitor::TerminationMonitor;
pub use registry::BodyRegistry;
pub use schedule::{ScheduledTask, Scheduler};
pub use state::{
    BlockHandle, Boundary, GameEvent, GameOverReason, LetterBlock, RoundPhase, Word, WordId,
};
pub use tick::{Round, TickInput, tick};
pub use words::{WordSource, is_valid_word};
pub use world::{
    BodyDesc, BodyId, CollisionPair, ConstraintDesc, ConstraintId, PhysicsError, PhysicsWorld,
};
