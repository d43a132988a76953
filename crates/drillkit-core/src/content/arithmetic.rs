//! Arithmetic speed-test problems.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::content::batch_rng;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind, Operator};
use crate::model::Difficulty;
use crate::traits::{BatchRequest, ContentSource};

/// Generates `a op b` problems whose operand range grows with the level.
#[derive(Debug, Clone)]
pub struct ArithmeticSource {
    pub operators: Vec<Operator>,
    /// Largest operand at level 1.
    pub base_range: i64,
}

impl Default for ArithmeticSource {
    fn default() -> Self {
        Self {
            operators: Operator::ALL.to_vec(),
            base_range: 10,
        }
    }
}

impl ArithmeticSource {
    pub fn with_operators(operators: Vec<Operator>) -> Self {
        Self {
            operators,
            ..Self::default()
        }
    }

    /// Largest operand for addition and subtraction at `level`.
    pub fn ceiling(&self, level: u32, difficulty: Difficulty) -> i64 {
        let ceiling = self.base_range.max(1) * level.max(1) as i64;
        match difficulty {
            Difficulty::Hard => ceiling * 2,
            _ => ceiling,
        }
    }

    /// Build one problem.
    ///
    /// Subtraction never goes negative. Division picks the quotient and the
    /// divisor first and multiplies them, so every quotient is an integer.
    pub fn problem<R: Rng + ?Sized>(&self, rng: &mut R, level: u32, difficulty: Difficulty) -> Item {
        let ceiling = self.ceiling(level, difficulty);
        let factor_ceiling = (ceiling / 2).max(5);

        let easy_ops: Vec<Operator> = self
            .operators
            .iter()
            .copied()
            .filter(|op| matches!(op, Operator::Add | Operator::Sub))
            .collect();
        let pool = if difficulty == Difficulty::Easy && !easy_ops.is_empty() {
            &easy_ops
        } else {
            &self.operators
        };
        let op = pool.choose(rng).copied().unwrap_or(Operator::Add);

        let (lhs, rhs) = match op {
            Operator::Add => (rng.gen_range(1..=ceiling), rng.gen_range(1..=ceiling)),
            Operator::Sub => {
                let a = rng.gen_range(1..=ceiling);
                let b = rng.gen_range(1..=ceiling);
                (a.max(b), a.min(b))
            }
            Operator::Mul => (
                rng.gen_range(1..=factor_ceiling),
                rng.gen_range(1..=factor_ceiling),
            ),
            Operator::Div => {
                let divisor = rng.gen_range(1..=factor_ceiling);
                let quotient = rng.gen_range(1..=factor_ceiling);
                (divisor * quotient, divisor)
            }
        };

        Item::new(ItemKind::Arithmetic { lhs, op, rhs })
    }
}

#[async_trait]
impl ContentSource for ArithmeticSource {
    fn name(&self) -> &str {
        "arithmetic"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let mut rng = batch_rng(request);
        Ok((0..request.count)
            .map(|_| self.problem(&mut rng, request.level, request.difficulty))
            .collect())
    }
}
