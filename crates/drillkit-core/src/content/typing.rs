//! Typing-speed prompts, one word per item.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::content::batch_rng;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::model::Difficulty;
use crate::traits::{BatchRequest, ContentSource};

const PASSAGES: &[&str] = &[
    "Plants turn sunlight water and carbon dioxide into sugar and oxygen",
    "The heart pumps blood through arteries veins and tiny capillaries",
    "Sound travels as a wave of pressure through air water and solid rock",
    "Volcanoes form where molten rock rises through cracks in the crust",
    "Every atom has a nucleus of protons and neutrons wrapped in electrons",
    "Ice floats because water expands as it freezes into a crystal lattice",
    "The moon has no light of its own and only reflects the light of the sun",
    "Bees carry pollen between flowers so that the plants can make seeds",
];

/// Splits passages into words. Easy keeps words of six letters or fewer;
/// hard keeps the passage's capitalisation.
#[derive(Debug, Clone)]
pub struct TypingSource {
    pub passages: Vec<String>,
}

impl Default for TypingSource {
    fn default() -> Self {
        Self {
            passages: PASSAGES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl TypingSource {
    pub fn with_passages(passages: Vec<String>) -> Self {
        Self { passages }
    }

    fn words(&self, difficulty: Difficulty, order: &[usize]) -> Vec<String> {
        order
            .iter()
            .filter_map(|&i| self.passages.get(i))
            .flat_map(|passage| passage.split_whitespace())
            .filter(|word| difficulty != Difficulty::Easy || word.chars().count() <= 6)
            .map(|word| match difficulty {
                Difficulty::Hard => word.to_string(),
                _ => word.to_lowercase(),
            })
            .collect()
    }
}

#[async_trait]
impl ContentSource for TypingSource {
    fn name(&self) -> &str {
        "typing"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let mut rng = batch_rng(request);
        let mut order: Vec<usize> = (0..self.passages.len()).collect();
        order.shuffle(&mut rng);

        let words = self.words(request.difficulty, &order);
        if words.is_empty() {
            return Err(GenerationError::Unavailable("no typing passages".into()));
        }

        // Cycle through the shuffled passages until the request is filled.
        Ok(words
            .iter()
            .cycle()
            .take(request.count)
            .map(|word| Item::new(ItemKind::TypingPrompt { word: word.clone() }))
            .collect())
    }
}
