//! Word-scramble rounds.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::content::batch_rng;
use crate::content::shuffle::scramble_word;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::model::Difficulty;
use crate::traits::{BatchRequest, ContentSource};

const WORDS: &[(&str, &str)] = &[
    ("atom", "smallest unit of an element"),
    ("cell", "basic unit of life"),
    ("gene", "unit of heredity"),
    ("lava", "molten rock above ground"),
    ("comet", "icy body with a tail"),
    ("orbit", "path around a planet or star"),
    ("prism", "splits white light"),
    ("fossil", "preserved remains in rock"),
    ("magnet", "attracts iron"),
    ("planet", "orbits a star"),
    ("enzyme", "protein that speeds up reactions"),
    ("neuron", "nerve cell"),
    ("gravity", "pulls masses together"),
    ("crystal", "ordered solid"),
    ("erosion", "wearing away of rock"),
    ("molecule", "bonded group of atoms"),
    ("electron", "negative particle"),
    ("friction", "force that resists sliding"),
    ("ecosystem", "community and its environment"),
    ("telescope", "instrument for seeing far away"),
    ("chromosome", "packaged strand of DNA"),
    ("atmosphere", "layer of gases around a planet"),
    ("photosynthesis", "how plants make sugar from light"),
];

/// Picks words whose length grows with the level and shuffles their letters.
/// Hard rounds come without hints.
#[derive(Debug, Clone)]
pub struct ScrambleSource {
    pub words: Vec<(String, String)>,
}

impl Default for ScrambleSource {
    fn default() -> Self {
        Self {
            words: WORDS
                .iter()
                .map(|(w, h)| (w.to_string(), h.to_string()))
                .collect(),
        }
    }
}

impl ScrambleSource {
    pub fn with_words(words: Vec<(String, String)>) -> Self {
        Self { words }
    }

    /// Longest word length allowed at `level`.
    pub fn max_len(level: u32) -> usize {
        4 + 2 * level.max(1) as usize
    }
}

#[async_trait]
impl ContentSource for ScrambleSource {
    fn name(&self) -> &str {
        "scramble"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let mut rng = batch_rng(request);
        let max_len = Self::max_len(request.level);
        let mut pool: Vec<&(String, String)> = self
            .words
            .iter()
            .filter(|(word, _)| word.chars().count() <= max_len)
            .collect();
        if pool.is_empty() {
            pool = self.words.iter().collect();
        }
        if pool.is_empty() {
            return Err(GenerationError::Unavailable("scramble word list is empty".into()));
        }

        let mut items = Vec::with_capacity(request.count);
        while items.len() < request.count {
            pool.shuffle(&mut rng);
            for (word, hint) in pool.iter().take(request.count - items.len()) {
                items.push(Item::new(ItemKind::ScrambledWord {
                    scrambled: scramble_word(word, &mut rng),
                    answer: word.clone(),
                    hint: (request.difficulty != Difficulty::Hard).then(|| hint.clone()),
                }));
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;
    use uuid::Uuid;

    fn request(count: usize, level: u32, difficulty: Difficulty) -> BatchRequest {
        BatchRequest {
            session_id: Uuid::nil(),
            variant: Variant::Scramble,
            count,
            level,
            difficulty,
            subject: None,
            seed: Some(21),
            batch_index: 0,
        }
    }

    #[tokio::test]
    async fn scrambled_words_differ_from_answers() {
        let items = ScrambleSource::default()
            .next(&request(30, 5, Difficulty::Medium))
            .await
            .unwrap();
        assert_eq!(items.len(), 30);
        for item in &items {
            let ItemKind::ScrambledWord {
                scrambled,
                answer,
                hint,
            } = &item.kind
            else {
                panic!("expected scrambled word");
            };
            assert_ne!(scrambled, answer);
            assert!(hint.is_some());
            assert!(item.is_correct(answer));
        }
    }

    #[tokio::test]
    async fn low_levels_use_short_words() {
        let items = ScrambleSource::default()
            .next(&request(10, 1, Difficulty::Medium))
            .await
            .unwrap();
        assert!(items.iter().all(|i| i.expected().chars().count() <= 6));
    }

    #[tokio::test]
    async fn hard_rounds_have_no_hint() {
        let items = ScrambleSource::default()
            .next(&request(5, 2, Difficulty::Hard))
            .await
            .unwrap();
        assert!(items
            .iter()
            .all(|i| matches!(&i.kind, ItemKind::ScrambledWord { hint: None, .. })));
    }
}
