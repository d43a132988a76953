//! Memory-match decks.

use std::collections::HashSet;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::content::batch_rng;
use crate::content::shuffle::shuffle_distinct;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::traits::{BatchRequest, ContentSource};

const CONCEPTS: &[&str] = &[
    "atom", "cell", "gene", "force", "orbit", "prism", "enzyme", "neuron", "magnet", "fossil",
    "photon", "vector", "planet", "lava", "acid", "habitat",
];

/// Builds a deck with two cards per concept and emits one `MatchPair` item
/// per concept. `request.count` is the number of pairs.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub concepts: Vec<String>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            concepts: CONCEPTS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl MemorySource {
    /// Repeated concepts are dropped; each concept must own exactly two cards.
    pub fn with_concepts(concepts: Vec<String>) -> Self {
        Self {
            concepts: distinct(&concepts),
        }
    }

    /// Deck layout for the chosen concepts: each concept twice, shuffled.
    pub fn deal<R: rand::Rng + ?Sized>(concepts: &[String], rng: &mut R) -> Vec<String> {
        let ordered: Vec<String> = concepts
            .iter()
            .flat_map(|c| [c.clone(), c.clone()])
            .collect();
        shuffle_distinct(&ordered, rng)
    }
}

fn distinct(concepts: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    concepts
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

#[async_trait]
impl ContentSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        if self.concepts.is_empty() {
            return Err(GenerationError::Unavailable("memory deck has no concepts".into()));
        }
        let concepts = distinct(&self.concepts);
        let mut rng = batch_rng(request);
        let pairs = request.count.min(concepts.len());
        let chosen: Vec<String> = concepts
            .choose_multiple(&mut rng, pairs)
            .cloned()
            .collect();
        let deck = Self::deal(&chosen, &mut rng);

        Ok(chosen
            .iter()
            .map(|concept| {
                let mut at = deck
                    .iter()
                    .enumerate()
                    .filter(|(_, card)| *card == concept)
                    .map(|(i, _)| i);
                let first = at.next().unwrap_or(0);
                let second = at.next().unwrap_or(first);
                Item::new(ItemKind::MatchPair {
                    concept: concept.clone(),
                    positions: (first, second),
                    deck_size: deck.len(),
                })
            })
            .collect())
    }
}
