use anyhow::{bail, Result};
use rand::Rng;
use std::path::Path;
use tokio::fs;

/// Fixed word pool the grid draws from. Draws are uniform and may
/// repeat both across calls and across the grid.
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Load a vocabulary from a newline-separated word list file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let words: Vec<String> = content
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|word| word.len() >= 2)
            .collect();

        if words.is_empty() {
            bail!("word list contained no usable words");
        }

        tracing::info!("Loaded {} words into vocabulary", words.len());

        Ok(Self { words })
    }

    /// Small built-in word list used when no word file is available,
    /// so the game stays playable out of the box
    pub fn builtin() -> Self {
        let words = [
            "apple", "river", "music", "cloud", "tiger", "bread", "light",
            "ocean", "stone", "dream", "grass", "house", "plane", "smile",
            "storm", "chair", "dance", "earth", "fruit", "glass", "heart",
            "knife", "lemon", "money", "night", "paint", "queen", "radio",
            "sugar", "table", "voice", "water", "wheel", "youth", "beach",
            "candy", "doctor", "engine", "forest", "garden", "hammer",
            "island", "jacket", "kitten", "ladder", "market", "needle",
            "orange", "pencil", "rocket", "school", "ticket", "violin",
            "window", "winter",
        ];
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Draw one word uniformly at random
    pub fn draw(&self, rng: &mut impl Rng) -> String {
        self.words[rng.random_range(0..self.words.len())].clone()
    }

    /// Get the number of words in the vocabulary
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
