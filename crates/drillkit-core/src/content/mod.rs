//! Content sources: procedural generators and the remote quiz source.
//!
//! Every procedural source is seeded from [`BatchRequest::batch_seed`] so a
//! fixed session seed reproduces the same items.

pub mod arithmetic;
pub mod bank;
pub mod memory;
pub mod periodic;
pub mod remote;
pub mod scramble;
pub mod shuffle;
pub mod sudoku;
pub mod typing;

use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

use crate::traits::{BatchRequest, ContentSource};

pub use arithmetic::ArithmeticSource;
pub use bank::BankSource;
pub use memory::MemorySource;
pub use periodic::PeriodicSource;
pub use remote::RemoteQuizSource;
pub use scramble::ScrambleSource;
pub use sudoku::SudokuSource;
pub use typing::TypingSource;

/// RNG for one batch: seeded when the session has a seed, entropy otherwise.
pub fn batch_rng(request: &BatchRequest) -> Mcg128Xsl64 {
    match request.batch_seed() {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::from_entropy(),
    }
}

/// All built-in procedural sources, keyed by their registered names.
pub fn procedural_sources() -> Vec<Arc<dyn ContentSource>> {
    vec![
        Arc::new(ArithmeticSource::default()),
        Arc::new(MemorySource::default()),
        Arc::new(SudokuSource),
        Arc::new(TypingSource::default()),
        Arc::new(ScrambleSource::default()),
        Arc::new(PeriodicSource),
    ]
}
