use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow};
use peezme_types::WordDefinition;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

/// Word lookup consumed by the game engine. Unknown words are a normal
/// outcome and come back with `valid == false`, never as an error.
pub trait Dictionary: Send + Sync {
    fn lookup(&self, word: &str) -> WordDefinition;
}

pub struct WordValidator {
    entries: HashMap<String, String>, // word -> definition
}

impl WordValidator {
    /// Load every `.txt` word list in a directory.
    pub fn new<P: AsRef<Path>>(words_dir: P) -> Result<Self> {
        let words_dir = words_dir.as_ref();
        let mut entries = HashMap::new();

        for entry in std::fs::read_dir(words_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            let before = entries.len();
            Self::parse_into(&contents, &mut entries);
            debug!(
                "Loaded {} words from {}",
                entries.len() - before,
                path.display()
            );
        }

        if entries.is_empty() {
            return Err(anyhow!("No words found in {}", words_dir.display()));
        }

        info!("Dictionary ready with {} words", entries.len());
        Ok(Self { entries })
    }

    /// Build a validator from a word list. Each line is `word` or
    /// `word<TAB>definition`; blank lines and `#` comments are skipped.
    pub fn from_word_list(word_list: &str) -> Self {
        let mut entries = HashMap::new();
        Self::parse_into(word_list, &mut entries);
        Self { entries }
    }

    fn parse_into(word_list: &str, entries: &mut HashMap<String, String>) {
        for line in word_list.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (word, definition) = match line.split_once('\t') {
                Some((word, definition)) => (word.trim(), definition.trim()),
                None => (line, ""),
            };

            let word = word.to_lowercase();
            if word.is_empty() || !Self::is_alphabetic(&word) {
                continue;
            }
            entries.insert(word, definition.to_string());
        }
    }

    pub fn is_valid_word(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        self.entries.contains_key(&word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick `count` distinct words in random order.
    pub fn random_words<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<String>> {
        if self.entries.is_empty() {
            return Err(anyhow!("No words available"));
        }

        // Sorted so a seeded rng always yields the same pool
        let mut words: Vec<&String> = self.entries.keys().collect();
        words.sort();

        let mut picked: Vec<String> = words
            .choose_multiple(rng, count.min(words.len()))
            .map(|w| (*w).clone())
            .collect();
        picked.shuffle(rng);
        Ok(picked)
    }

    pub fn is_alphabetic(word: &str) -> bool {
        word.chars().all(|c| c.is_alphabetic())
    }
}

impl Dictionary for WordValidator {
    fn lookup(&self, word: &str) -> WordDefinition {
        let normalized = word.trim().to_lowercase();
        match self.entries.get(&normalized) {
            Some(definition) => WordDefinition {
                word: normalized,
                valid: true,
                definition: definition.clone(),
            },
            None => WordDefinition {
                word: normalized,
                valid: false,
                definition: String::new(),
            },
        }
    }
}
