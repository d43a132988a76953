//! Shuffles that never hand back the original order.

use rand::seq::SliceRandom;
use rand::Rng;

const MAX_RESHUFFLES: usize = 16;

/// Fisher–Yates shuffle that rejects the identity permutation.
///
/// For inputs with at least two distinct elements the result always differs
/// from `items`. After a bounded number of unlucky reshuffles it falls back
/// to rotating by one, which differs from the input unless every element is
/// equal. Inputs without two distinct elements are returned unchanged.
pub fn shuffle_distinct<T, R>(items: &[T], rng: &mut R) -> Vec<T>
where
    T: Clone + PartialEq,
    R: Rng + ?Sized,
{
    let mut out = items.to_vec();
    if !has_two_distinct(items) {
        return out;
    }

    for _ in 0..MAX_RESHUFFLES {
        out.shuffle(rng);
        if out.as_slice() != items {
            return out;
        }
    }

    let mut rotated = items.to_vec();
    rotated.rotate_left(1);
    rotated
}

/// Scramble the letters of a word; see [`shuffle_distinct`].
pub fn scramble_word<R: Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let chars: Vec<char> = word.chars().collect();
    shuffle_distinct(&chars, rng).into_iter().collect()
}

fn has_two_distinct<T: PartialEq>(items: &[T]) -> bool {
    items.first().is_some_and(|first| items.iter().any(|x| x != first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    #[test]
    fn shuffled_output_differs_from_input() {
        let words = ["ab", "abc", "aab", "banana", "photosynthesis", "xy"];
        for seed in 0..200 {
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            for word in words {
                let scrambled = scramble_word(word, &mut rng);
                assert_ne!(scrambled, word, "seed {seed} left {word} unscrambled");
                let mut a: Vec<char> = scrambled.chars().collect();
                let mut b: Vec<char> = word.chars().collect();
                a.sort_unstable();
                b.sort_unstable();
                assert_eq!(a, b, "scramble must be a permutation");
            }
        }
    }

    #[test]
    fn card_deck_shuffle_differs() {
        let deck = vec![1, 1, 2, 2, 3, 3];
        for seed in 0..200 {
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            assert_ne!(shuffle_distinct(&deck, &mut rng), deck);
        }
    }

    #[test]
    fn uniform_input_is_returned_as_is() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        assert_eq!(scramble_word("aaa", &mut rng), "aaa");
        assert_eq!(scramble_word("", &mut rng), "");
        assert_eq!(scramble_word("a", &mut rng), "a");
    }

    /// The fallback rotation differs even for repeating patterns.
    #[test]
    fn rotation_fallback_differs() {
        let items = ['a', 'b', 'a', 'b'];
        let mut rotated = items.to_vec();
        rotated.rotate_left(1);
        assert_ne!(rotated.as_slice(), &items[..]);
    }

    #[test]
    fn same_seed_same_scramble() {
        let mut a = Mcg128Xsl64::seed_from_u64(9);
        let mut b = Mcg128Xsl64::seed_from_u64(9);
        assert_eq!(scramble_word("element", &mut a), scramble_word("element", &mut b));
    }
}
