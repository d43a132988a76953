//! Periodic-table multiple-choice questions.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::content::batch_rng;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::model::Difficulty;
use crate::traits::{BatchRequest, ContentSource};

/// `(atomic number, symbol, name)`
const ELEMENTS: &[(u32, &str, &str)] = &[
    (1, "H", "Hydrogen"),
    (2, "He", "Helium"),
    (3, "Li", "Lithium"),
    (4, "Be", "Beryllium"),
    (5, "B", "Boron"),
    (6, "C", "Carbon"),
    (7, "N", "Nitrogen"),
    (8, "O", "Oxygen"),
    (9, "F", "Fluorine"),
    (10, "Ne", "Neon"),
    (11, "Na", "Sodium"),
    (12, "Mg", "Magnesium"),
    (13, "Al", "Aluminium"),
    (14, "Si", "Silicon"),
    (15, "P", "Phosphorus"),
    (16, "S", "Sulfur"),
    (17, "Cl", "Chlorine"),
    (18, "Ar", "Argon"),
    (19, "K", "Potassium"),
    (20, "Ca", "Calcium"),
    (26, "Fe", "Iron"),
    (29, "Cu", "Copper"),
    (30, "Zn", "Zinc"),
    (47, "Ag", "Silver"),
    (50, "Sn", "Tin"),
    (53, "I", "Iodine"),
    (79, "Au", "Gold"),
    (80, "Hg", "Mercury"),
    (82, "Pb", "Lead"),
    (92, "U", "Uranium"),
];

const OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy)]
enum Ask {
    SymbolOf,
    NameOf,
    NumberOf,
}

/// Easy questions stay within the first twenty elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicSource;

fn pool(difficulty: Difficulty) -> &'static [(u32, &'static str, &'static str)] {
    match difficulty {
        Difficulty::Easy => &ELEMENTS[..20],
        _ => ELEMENTS,
    }
}

fn render(ask: Ask, element: &(u32, &str, &str)) -> String {
    match ask {
        Ask::SymbolOf => element.1.to_string(),
        Ask::NameOf => element.2.to_string(),
        Ask::NumberOf => element.0.to_string(),
    }
}

fn question<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Option<Item> {
    let elements = pool(difficulty);
    let picked: Vec<_> = elements.choose_multiple(rng, OPTIONS).copied().collect();
    let &(number, symbol, name) = picked.first()?;

    let ask = *[Ask::SymbolOf, Ask::NameOf, Ask::NumberOf].choose(rng)?;
    let question = match ask {
        Ask::SymbolOf => format!("What is the chemical symbol of {name}?"),
        Ask::NameOf => format!("Which element has the symbol {symbol}?"),
        Ask::NumberOf => format!("What is the atomic number of {name}?"),
    };

    let mut options: Vec<String> = picked.iter().map(|e| render(ask, e)).collect();
    options.shuffle(rng);
    let correct = render(ask, &(number, symbol, name));
    let correct_index = options.iter().position(|o| *o == correct)?;

    Some(Item::new(ItemKind::MultipleChoice {
        question,
        options,
        correct_index,
        explanation: Some(format!("{name} ({symbol}) is element {number}.")),
    }))
}

#[async_trait]
impl ContentSource for PeriodicSource {
    fn name(&self) -> &str {
        "periodic"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let mut rng = batch_rng(request);
        (0..request.count)
            .map(|_| {
                question(&mut rng, request.difficulty).ok_or_else(|| {
                    GenerationError::Unavailable("element table too small".into())
                })
            })
            .collect()
    }
}
