//! Random primitives shared by the grammar and the catalog samplers.
//!
//! All randomness flows through a single seeded [`ChaCha8Rng`] owned by the
//! generator state, so a fixed seed reproduces the exact statement stream.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub fn random_bool(rng: &mut ChaCha8Rng) -> bool {
    rng.random_bool(0.5)
}

/// Uniform sample over the inclusive range `[lo, hi]`.
pub fn random_int(rng: &mut ChaCha8Rng, lo: i64, hi: i64) -> i64 {
    debug_assert!(lo <= hi, "empty range {lo}..={hi}");
    rng.random_range(lo..=hi)
}

/// Uniform sample over `[lo, hi]` rendered as a decimal string.
pub fn random_num(rng: &mut ChaCha8Rng, lo: i64, hi: i64) -> String {
    random_int(rng, lo, hi).to_string()
}

/// Sample an index with probability proportional to its non-negative weight.
///
/// Weights of zero are excluded from the draw. Returns `None` when every
/// weight is zero, letting the caller emit nothing instead of failing.
pub fn frequency(weights: &[u32], rng: &mut ChaCha8Rng) -> Option<usize> {
    let total: u64 = weights.iter().map(|w| *w as u64).sum();
    if total == 0 {
        return None;
    }
    let mut point = rng.random_range(0..total);
    for (i, w) in weights.iter().enumerate() {
        let w = *w as u64;
        if point < w {
            return Some(i);
        }
        point -= w;
    }
    unreachable!("prefix sums must cover the sampled point")
}

pub fn pick_index(len: usize, rng: &mut ChaCha8Rng) -> usize {
    debug_assert!(len > 0, "cannot pick from an empty collection");
    rng.random_range(0..len)
}

pub fn pick<'a, T>(items: &'a [T], rng: &mut ChaCha8Rng) -> &'a T {
    &items[pick_index(items.len(), rng)]
}

/// Partition `items` into at most `max_groups` non-empty ordered bins.
///
/// The relative order of the input is preserved; only the cut points are
/// random. Used for `partition by list` value grouping.
pub fn random_groups<T: Clone>(
    items: &[T],
    max_groups: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<T>> {
    assert!(max_groups > 0);
    if items.is_empty() {
        return Vec::new();
    }
    let group_cnt = pick_index(max_groups.min(items.len()), rng) + 1;
    let mut cuts: Vec<usize> = (1..items.len()).collect();
    let mut chosen = Vec::with_capacity(group_cnt - 1);
    for _ in 0..group_cnt - 1 {
        let at = pick_index(cuts.len(), rng);
        chosen.push(cuts.swap_remove(at));
    }
    chosen.sort_unstable();
    chosen.push(items.len());
    let mut groups = Vec::with_capacity(group_cnt);
    let mut start = 0;
    for end in chosen {
        groups.push(items[start..end].to_vec());
        start = end;
    }
    groups
}

/// Random lowercase ASCII string with `len` characters.
pub fn random_ascii(rng: &mut ChaCha8Rng, len: usize) -> String {
    (0..len)
        .map(|_| (b'a' + rng.random_range(0..26u8)) as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fixed_seed_reproduces_sequence() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let sa: Vec<i64> = (0..32).map(|_| random_int(&mut a, -100, 100)).collect();
        let sb: Vec<i64> = (0..32).map(|_| random_int(&mut b, -100, 100)).collect();
        assert_eq!(sa, sb);
    }

    #[test]
    fn frequency_skips_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1000 {
            let i = frequency(&[0, 3, 0, 1], &mut rng).unwrap();
            assert!(i == 1 || i == 3);
        }
        assert_eq!(frequency(&[0, 0], &mut rng), None);
    }

    #[test]
    fn frequency_is_fair() {
        // Observed frequencies should track w_i / sum(w) within 3 sigma.
        let weights = [1u32, 2, 3, 4];
        let trials = 40_000usize;
        let total: u32 = weights.iter().sum();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            counts[frequency(&weights, &mut rng).unwrap()] += 1;
        }
        for (i, w) in weights.iter().enumerate() {
            let p = *w as f64 / total as f64;
            let expected = trials as f64 * p;
            let sigma = (trials as f64 * p * (1.0 - p)).sqrt();
            let delta = (counts[i] as f64 - expected).abs();
            assert!(
                delta <= 3.0 * sigma,
                "weight {i}: observed {} expected {expected} (sigma {sigma})",
                counts[i]
            );
        }
    }

    #[test]
    fn random_groups_preserves_order_and_members() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let items: Vec<i32> = (0..20).collect();
            let groups = random_groups(&items, 3, &mut rng);
            assert!(!groups.is_empty() && groups.len() <= 3);
            let flat: Vec<i32> = groups.iter().flatten().copied().collect();
            assert_eq!(flat, items);
            assert!(groups.iter().all(|g| !g.is_empty()));
        }
    }
}
