//! Round data model
//!
//! Words, letter blocks, boundaries and the events the core emits for
//! presentation.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::world::BodyId;

/// Handle of a letter block (the block's physics body)
pub type BlockHandle = BodyId;

/// Serial number of a spawned word
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordId(pub u32);

/// Round phase; `GameOver` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Playing,
    GameOver,
}

/// Play-field wall identity, assigned when the wall is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boundary {
    Top,
    Bottom,
    Left,
    Right,
}

impl Boundary {
    pub const ALL: [Self; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];
}

/// Side-table record for one letter block
#[derive(Debug, Clone, PartialEq)]
pub struct LetterBlock {
    pub body: BodyId,
    pub letter: char,
    /// No longer accepts input; falls at a forced speed
    pub frozen: bool,
    /// Word the block was spawned with
    pub word: WordId,
    /// Collision group shared by a fresh chain until the block freezes
    pub spawn_group: Option<i32>,
    /// Last position read from the engine (used for effects after removal)
    pub last_position: Vec2,
}

/// The active word: characters still to type and their blocks, front first
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub id: WordId,
    remaining: VecDeque<char>,
    blocks: VecDeque<BlockHandle>,
}

impl Word {
    /// Pairs up text and blocks; `None` if the lengths differ or nothing is left
    pub fn new(id: WordId, text: &str, blocks: Vec<BlockHandle>) -> Option<Self> {
        let remaining: VecDeque<char> = text.chars().collect();
        if remaining.is_empty() || remaining.len() != blocks.len() {
            return None;
        }
        Some(Self {
            id,
            remaining,
            blocks: blocks.into(),
        })
    }

    /// The character the player must type next
    pub fn expected(&self) -> Option<char> {
        self.remaining.front().copied()
    }

    /// The only block accepting input
    pub fn active_block(&self) -> Option<BlockHandle> {
        self.blocks.front().copied()
    }

    pub fn remaining_text(&self) -> String {
        self.remaining.iter().collect()
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockHandle> + '_ {
        self.blocks.iter().copied()
    }

    pub fn contains(&self, block: BlockHandle) -> bool {
        self.blocks.contains(&block)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Pops the front character and block together
    pub fn pop_front(&mut self) -> Option<(char, BlockHandle)> {
        let letter = self.remaining.pop_front()?;
        let block = self.blocks.pop_front()?;
        Some((letter, block))
    }

    /// Empties the word, returning its blocks in order
    pub fn drain_blocks(&mut self) -> Vec<BlockHandle> {
        self.remaining.clear();
        self.blocks.drain(..).collect()
    }

    /// Invariant check: text and blocks stay in lock-step
    pub fn is_consistent(&self) -> bool {
        self.remaining.len() == self.blocks.len()
    }
}

/// Why the round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// A frozen block touched the top wall
    TopCollision,
    /// The highest block is frozen and resting above the game-over line
    SettledAboveLine,
}

/// Signals for presentation (effects, HUD, round-end screen)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    WordSpawned {
        text: String,
        blocks: Vec<BlockHandle>,
        /// Preview of the word after this one
        upcoming: Option<String>,
    },
    /// Highlight the new active block
    WordAdvance {
        remaining: String,
        active: BlockHandle,
    },
    ScoreIncrement {
        points: u64,
    },
    /// Freeze effect
    BlockFrozen {
        block: BlockHandle,
        position: Vec2,
    },
    /// Burn effect (typed away or swept out of the field)
    BlockDestroyed {
        block: BlockHandle,
        position: Vec2,
    },
    /// Game-over explosion
    BlockExploded {
        block: BlockHandle,
        position: Vec2,
    },
    RoundOver {
        final_score: u64,
        reason: GameOverReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(n: u32) -> Vec<BlockHandle> {
        (1..=n).map(BodyId).collect()
    }

    #[test]
    fn test_word_rejects_mismatched_lengths() {
        assert!(Word::new(WordId(1), "cat", handles(2)).is_none());
        assert!(Word::new(WordId(1), "", Vec::new()).is_none());
    }

    #[test]
    fn test_pop_front_keeps_lockstep() {
        let mut word = Word::new(WordId(1), "dog", handles(3)).unwrap();
        assert_eq!(word.expected(), Some('d'));
        assert_eq!(word.pop_front(), Some(('d', BodyId(1))));
        assert!(word.is_consistent());
        assert_eq!(word.remaining_text(), "og");
        assert_eq!(word.active_block(), Some(BodyId(2)));
        assert!(!word.contains(BodyId(1)));
    }

    #[test]
    fn test_drain_blocks_empties_word() {
        let mut word = Word::new(WordId(1), "og", handles(2)).unwrap();
        assert_eq!(word.drain_blocks(), handles(2));
        assert!(word.is_empty());
        assert!(word.is_consistent());
        assert_eq!(word.expected(), None);
    }
}
