//! 4×4 sudoku boards.
//!
//! Boards are drawn from a small bank of puzzles with unique solutions, then
//! relabelled with a random digit permutation and optionally transposed.
//! Both transforms preserve uniqueness.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::content::batch_rng;
use crate::error::GenerationError;
use crate::item::{Grid, Item, ItemKind};
use crate::traits::{BatchRequest, ContentSource};

struct Puzzle {
    solution: Grid,
    givens: Grid,
}

const PUZZLES: [Puzzle; 3] = [
    Puzzle {
        solution: [[1, 2, 3, 4], [3, 4, 1, 2], [2, 1, 4, 3], [4, 3, 2, 1]],
        givens: [[1, 0, 3, 0], [0, 4, 0, 2], [2, 0, 4, 0], [0, 3, 0, 1]],
    },
    Puzzle {
        solution: [[2, 1, 4, 3], [4, 3, 2, 1], [1, 2, 3, 4], [3, 4, 1, 2]],
        givens: [[2, 0, 4, 0], [0, 3, 0, 1], [1, 0, 3, 0], [0, 4, 0, 2]],
    },
    Puzzle {
        solution: [[1, 3, 2, 4], [2, 4, 1, 3], [3, 1, 4, 2], [4, 2, 3, 1]],
        givens: [[0, 3, 0, 4], [2, 0, 1, 0], [0, 1, 0, 2], [4, 0, 3, 0]],
    },
];

/// Emits one `GridCell` item per blank; `request.count` is the number of
/// boards, and each board is its own group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudokuSource;

fn relabel(grid: &Grid, digits: &[u8; 4]) -> Grid {
    grid.map(|row| row.map(|cell| if cell == 0 { 0 } else { digits[cell as usize - 1] }))
}

fn transpose(grid: &Grid) -> Grid {
    let mut out = [[0; 4]; 4];
    for (r, row) in grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            out[c][r] = *cell;
        }
    }
    out
}

/// Pick and disguise one board. Returns `(solution, givens)`.
pub fn board<R: Rng + ?Sized>(rng: &mut R) -> (Grid, Grid) {
    let puzzle = &PUZZLES[rng.gen_range(0..PUZZLES.len())];
    let mut digits = [1u8, 2, 3, 4];
    digits.shuffle(rng);

    let mut solution = relabel(&puzzle.solution, &digits);
    let mut givens = relabel(&puzzle.givens, &digits);
    if rng.gen_bool(0.5) {
        solution = transpose(&solution);
        givens = transpose(&givens);
    }
    (solution, givens)
}

#[async_trait]
impl ContentSource for SudokuSource {
    fn name(&self) -> &str {
        "sudoku"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let mut rng = batch_rng(request);
        let mut items = Vec::new();
        for group in 0..request.count as u32 {
            let (solution, givens) = board(&mut rng);
            for row in 0..4 {
                for col in 0..4 {
                    if givens[row][col] == 0 {
                        items.push(
                            Item::new(ItemKind::GridCell {
                                row,
                                col,
                                solution: solution[row][col],
                                givens,
                            })
                            .with_group(group),
                        );
                    }
                }
            }
        }
        Ok(items)
    }
}
