//! Word source
//!
//! Picks the next word for a spawn: length-bounded, letters only, no letter
//! more than three times, nothing from the banned list, and no repeats until
//! most of the candidate pool has been used.

use std::collections::{HashSet, VecDeque};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{MAX_WORD_LENGTH, MIN_WORD_LENGTH};
use crate::settings::GameConfig;

/// Word returned when every other source comes up empty
pub const SAFE_DEFAULT_WORD: &str = "type";

/// A letter may appear at most this many times in a word
const MAX_LETTER_REPEATS: usize = 3;

/// Short function words and protocol acronyms that never make good targets
pub const BANNED_WORDS: &[&str] = &[
    "the", "and", "for", "but", "nor", "yet", "was", "are", "its", "his", "her", "you",
    "http", "https", "www", "html", "css", "api", "url", "ftp", "ssh", "tcp", "udp", "dns",
];

/// Small list used when random generation keeps failing; covers every length 3..=15
pub const EMERGENCY_WORDS: &[&str] = &[
    "cat", "sun", "tree", "word", "house", "light", "garden", "window", "balance", "keyboard",
    "mountain", "notebook", "adventure", "landscape", "waterfall", "friendship", "playground",
    "butterflies", "championship", "constellation", "thunderstorms", "photosynthesis",
    "responsibility", "transformations", "straightforward",
];

/// Main candidate pool
pub const WORD_LIST: &[&str] = &[
    // 3
    "ant", "ape", "bat", "bee", "bug", "cow", "dog", "eel", "elk", "emu", "fly", "fox", "hen",
    "koi", "owl", "pig", "ram", "rat", "yak", "map", "cup", "box", "key", "ink", "jam", "oak",
    "sky", "sea", "ice", "arc",
    // 4
    "code", "game", "type", "fast", "slow", "word", "play", "jump", "fall", "moon", "star",
    "bird", "fish", "frog", "duck", "lion", "bear", "wolf", "deer", "goat", "swan", "seal",
    "mole", "mice", "wasp", "kite", "lamb", "lynx", "rust", "byte", "loop", "gear", "iron",
    "snow", "rain", "leaf", "rock", "sand", "wave", "fire",
    // 5
    "block", "chain", "frost", "stack", "crane", "tiger", "zebra", "eagle", "whale", "shark",
    "otter", "raven", "cloud", "storm", "river", "stone", "flame", "glass", "metal", "plant",
    "spark", "pixel", "sword", "crown", "quilt", "vapor", "grape", "orbit", "comet", "lemon",
    // 6
    "letter", "typing", "frozen", "anchor", "gopher", "falcon", "badger", "beaver", "parrot",
    "turtle", "rabbit", "monkey", "spider", "planet", "meteor", "rocket", "castle", "bridge",
    "forest", "island", "canyon", "desert", "jungle", "marble", "copper", "silver", "violet",
    "orange", "puzzle", "wizard",
    // 7
    "cascade", "lexicon", "glacier", "thunder", "monsoon", "volcano", "dolphin", "penguin",
    "giraffe", "leopard", "panther", "octopus", "lantern", "compass", "harvest", "orchard",
    "gravity", "crystal", "journey", "kingdom", "library", "mystery", "rainbow", "sunrise",
    "voyager", "whisper", "blanket", "cabinet", "diamond", "scholar",
    // 8
    "keyboard", "alphabet", "sentence", "hedgehog", "elephant", "kangaroo", "flamingo",
    "squirrel", "mountain", "overcast", "blizzard", "midnight", "festival", "treasure",
    "calendar", "triangle", "painting", "sculptor", "notebook", "sapphire", "daylight",
    "firework", "language", "molecule", "platform",
    // 9
    "adventure", "carpenter", "avalanche", "character", "chocolate", "crocodile", "dandelion",
    "fireplace", "landscape", "lightning", "nightfall", "orchestra", "pineapple", "signature",
    "telescope", "waterfall", "wonderful", "labyrinth", "hurricane", "porcupine",
    // 10
    "friendship", "playground", "background", "strawberry", "watermelon", "lighthouse",
    "motorcycle", "helicopter", "blackboard", "paintbrush", "snowflakes", "tournament",
    "apprentice", "chimpanzee",
    // 11
    "programming", "adventurous", "butterflies", "backgrounds", "grasshopper", "thermometer",
    "nightingale", "countryside", "marketplace", "fingerprint",
    // 12
    "championship", "kaleidoscope", "grasshoppers", "thunderstorm", "encyclopedia",
    "breakthrough", "neighborhood",
    // 13
    "constellation", "extraordinary", "thunderstorms", "uncomfortable", "technological",
    "comprehension",
    // 14
    "photosynthesis", "responsibility", "archaeological", "implementation",
    // 15
    "internationally", "transformations", "disappointments", "straightforward",
];

/// True if `word` is a usable target: ASCII letters only, no letter more than
/// three times, not banned
pub fn is_valid_word(word: &str) -> bool {
    if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let mut counts = [0usize; 26];
    for c in word.chars() {
        let i = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        counts[i] += 1;
        if counts[i] > MAX_LETTER_REPEATS {
            return false;
        }
    }
    let lower = word.to_ascii_lowercase();
    !BANNED_WORDS.contains(&lower.as_str())
}

/// Inclusive length range actually used for a request
pub fn length_bounds(min_len: usize, max_len: usize, cap: usize) -> (usize, usize) {
    let cap = cap.clamp(MIN_WORD_LENGTH, MAX_WORD_LENGTH);
    let lo = min_len.max(MIN_WORD_LENGTH).min(cap);
    let hi = max_len.min(cap).max(lo);
    (lo, hi)
}

pub struct WordSource {
    /// Validated, lowercase, deduplicated pool
    pool: Vec<String>,
    rng: Pcg32,
    /// Recently used words, oldest first
    recent: VecDeque<String>,
    recent_set: HashSet<String>,
    /// Pre-computed word for the next spawn
    upcoming: Option<String>,
    cap: usize,
    retries: u32,
    fill_ratio: f32,
    evict_fraction: f32,
}

impl WordSource {
    /// Source over the built-in list
    pub fn new(config: &GameConfig) -> Self {
        Self::with_words(WORD_LIST.iter().copied(), config)
    }

    /// Source over a custom list; invalid entries are dropped
    pub fn with_words<'a>(words: impl IntoIterator<Item = &'a str>, config: &GameConfig) -> Self {
        let mut seen = HashSet::new();
        let pool: Vec<String> = words
            .into_iter()
            .filter(|w| is_valid_word(w))
            .map(str::to_ascii_lowercase)
            .filter(|w| seen.insert(w.clone()))
            .collect();
        log::debug!("Word source ready with {} candidates", pool.len());
        Self {
            pool,
            // Separate stream from spawn placement
            rng: Pcg32::seed_from_u64(config.seed ^ 0x776f_7264),
            recent: VecDeque::new(),
            recent_set: HashSet::new(),
            upcoming: None,
            cap: config.max_word_length,
            retries: config.word_retries.max(1),
            fill_ratio: config.recent_fill_ratio,
            evict_fraction: config.recent_evict_fraction,
        }
    }

    /// Word for this spawn. Uses the previewed word when it still fits the
    /// bounds, then pre-computes the following one.
    pub fn next_word(&mut self, min_len: usize, max_len: usize) -> String {
        let (lo, hi) = length_bounds(min_len, max_len, self.cap);
        let word = match self.upcoming.take() {
            Some(w) if (lo..=hi).contains(&w.len()) => w,
            _ => self.generate(lo, hi),
        };
        self.upcoming = Some(self.generate(lo, hi));
        word
    }

    /// The word the next spawn will use (if one has been pre-computed)
    pub fn peek_next_word(&self) -> Option<&str> {
        self.upcoming.as_deref()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    fn generate(&mut self, lo: usize, hi: usize) -> String {
        let candidates: Vec<usize> = self
            .pool
            .iter()
            .enumerate()
            .filter(|(_, w)| (lo..=hi).contains(&w.len()))
            .map(|(i, _)| i)
            .collect();

        if !candidates.is_empty() {
            self.maybe_evict(candidates.len());
            for _ in 0..self.retries {
                let pick = candidates[self.rng.random_range(0..candidates.len())];
                let word = &self.pool[pick];
                if !self.recent_set.contains(word) {
                    let word = word.clone();
                    self.remember(&word);
                    return word;
                }
            }
            log::debug!("No fresh word after {} attempts ({lo}..={hi})", self.retries);
        }

        self.emergency_word(lo, hi)
    }

    /// Evict the oldest slice of the recent set once it covers most of the pool
    fn maybe_evict(&mut self, candidate_count: usize) {
        let threshold = ((candidate_count as f32 * self.fill_ratio).floor() as usize).max(1);
        if self.recent.len() < threshold {
            return;
        }
        let evict = ((self.recent.len() as f32 * self.evict_fraction).ceil() as usize).max(1);
        for _ in 0..evict {
            if let Some(old) = self.recent.pop_front() {
                self.recent_set.remove(&old);
            }
        }
        log::debug!("Evicted {evict} recent words ({} remain)", self.recent.len());
    }

    fn remember(&mut self, word: &str) {
        if self.recent_set.insert(word.to_string()) {
            self.recent.push_back(word.to_string());
        }
    }

    fn emergency_word(&mut self, lo: usize, hi: usize) -> String {
        let fallback: Vec<&str> = EMERGENCY_WORDS
            .iter()
            .copied()
            .filter(|w| (lo..=hi).contains(&w.len()))
            .collect();
        if fallback.is_empty() {
            log::warn!("No emergency word fits {lo}..={hi}, using '{SAFE_DEFAULT_WORD}'");
            return SAFE_DEFAULT_WORD.to_string();
        }
        let word = fallback[self.rng.random_range(0..fallback.len())];
        log::warn!("Word generation exhausted, falling back to '{word}'");
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validation_rules() {
        assert!(is_valid_word("cascade"));
        assert!(!is_valid_word("the"));
        assert!(!is_valid_word("HTTP"));
        assert!(!is_valid_word("co-op"));
        assert!(!is_valid_word("mississippi")); // four s, four i
        assert!(is_valid_word("banana")); // three a
        assert!(!is_valid_word(""));
    }

    #[test]
    fn test_builtin_lists_are_valid() {
        for word in EMERGENCY_WORDS.iter().chain(WORD_LIST) {
            assert!(
                is_valid_word(word) || BANNED_WORDS.contains(word),
                "bad built-in word {word}"
            );
        }
        for len in MIN_WORD_LENGTH..=MAX_WORD_LENGTH {
            assert!(
                EMERGENCY_WORDS.iter().any(|w| w.len() == len),
                "no emergency word of length {len}"
            );
        }
    }

    #[test]
    fn test_length_bounds_clamp() {
        assert_eq!(length_bounds(1, 4, 15), (3, 4));
        assert_eq!(length_bounds(12, 40, 15), (12, 15));
        assert_eq!(length_bounds(20, 30, 15), (15, 15));
        assert_eq!(length_bounds(5, 9, 6), (5, 6));
    }

    #[test]
    fn test_no_immediate_repeats() {
        let source_config = GameConfig::default();
        let mut source = WordSource::new(&source_config);
        let mut prev = source.next_word(3, 5);
        for _ in 0..200 {
            let word = source.next_word(3, 5);
            assert_ne!(word, prev);
            prev = word;
        }
    }

    #[test]
    fn test_peek_matches_next_spawn() {
        let mut source = WordSource::new(&GameConfig::default());
        assert_eq!(source.peek_next_word(), None);
        source.next_word(4, 6);
        let preview = source.peek_next_word().unwrap().to_string();
        assert_eq!(source.next_word(4, 6), preview);
    }

    #[test]
    fn test_recent_set_is_evicted_when_full() {
        let config = GameConfig::default();
        let words = ["alpha", "bravo", "delta", "gamma", "omega"];
        let mut source = WordSource::with_words(words, &config);
        for _ in 0..100 {
            source.next_word(5, 5);
            assert!(source.recent_len() <= words.len());
        }
        // 5 candidates, 75% fill -> eviction keeps the set below the whole pool
        assert!(source.recent_len() < words.len());
    }

    #[test]
    fn test_exhausted_pool_uses_emergency_list() {
        let config = GameConfig::default();
        let mut source = WordSource::with_words(["cat"], &config);
        let word = source.next_word(9, 9);
        assert_eq!(word.len(), 9);
        assert!(EMERGENCY_WORDS.contains(&word.as_str()));
    }

    #[test]
    fn test_empty_fallback_uses_default() {
        let config = GameConfig {
            max_word_length: 15,
            ..GameConfig::default()
        };
        let mut source = WordSource::with_words(Vec::<&str>::new(), &config);
        // Every length 3..=15 has an emergency word; only an out-of-range request hits the default
        assert_eq!(source.emergency_word(16, 16), SAFE_DEFAULT_WORD);
        assert!(source.next_word(3, 3).len() == 3);
    }

    proptest! {
        #[test]
        fn prop_word_length_in_bounds(min in 0usize..20, span in 0usize..20, seed in any::<u64>()) {
            let max = min + span;
            let config = GameConfig { seed, ..GameConfig::default() };
            let mut source = WordSource::new(&config);
            let lo = min.max(3).min(15);
            let hi = max.min(15).max(lo);
            for _ in 0..5 {
                let word = source.next_word(min, max);
                prop_assert!(word.len() >= lo && word.len() <= hi, "{} not in {}..={}", word, lo, hi);
                prop_assert!(is_valid_word(&word));
            }
        }
    }
}
