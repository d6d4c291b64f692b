//! Weighted sampling without replacement.
//!
//! Each pick draws `r = u * total` from the shared [`Lcg`] stream and walks the
//! remaining pool subtracting weights until `r <= 0`. If rounding leaves `r`
//! positive after the last entry, the last entry is taken. The picked entry is
//! removed before the next pick.

use crate::domain::{Ticket, WeightVector, TICKET_SIZE};
use crate::rng::Lcg;

/// Pick up to `k` entries from `pool`. Returns `min(k, pool.len())` numbers,
/// ascending.
pub fn sample_without_replacement(mut pool: Vec<(u8, f64)>, k: usize, rng: &mut Lcg) -> Vec<u8> {
    let mut picked = Vec::with_capacity(k.min(pool.len()));
    while picked.len() < k && !pool.is_empty() {
        let total: f64 = pool.iter().map(|(_, w)| w).sum();
        let mut r = rng.next_f64() * total;

        let mut idx = pool.len() - 1;
        for (i, (_, w)) in pool.iter().enumerate() {
            r -= w;
            if r <= 0.0 {
                idx = i;
                break;
            }
        }

        let (number, _) = pool.remove(idx);
        picked.push(number);
    }
    picked.sort_unstable();
    picked
}

/// Draws six-number tickets from a fixed weight vector.
#[derive(Debug, Clone)]
pub struct WeightedSampler<'a> {
    weights: &'a WeightVector,
}

impl<'a> WeightedSampler<'a> {
    pub fn new(weights: &'a WeightVector) -> Self {
        Self { weights }
    }

    pub fn ticket(&self, rng: &mut Lcg) -> Ticket {
        let pool = self.weights.iter().collect();
        Ticket::new(sample_without_replacement(pool, TICKET_SIZE, rng))
    }

    pub fn tickets(&self, count: usize, rng: &mut Lcg) -> Vec<Ticket> {
        (0..count).map(|_| self.ticket(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_k_distinct_sorted() {
        let mut rng = Lcg::new(42);
        let pool: Vec<(u8, f64)> = (1..=60).map(|n| (n, 1.0)).collect();
        let picked = sample_without_replacement(pool, 6, &mut rng);
        assert_eq!(picked.len(), 6);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn small_pool_is_exhausted() {
        let mut rng = Lcg::new(1);
        let pool = vec![(9, 1.0), (3, 2.0)];
        assert_eq!(sample_without_replacement(pool, 6, &mut rng), vec![3, 9]);
    }

    #[test]
    fn zero_weight_entries_are_picked_last() {
        let mut rng = Lcg::new(7);
        let pool = vec![(1, 0.0), (2, 0.0), (3, 5.0)];
        // 3 carries all the mass; with it gone the remaining total is zero and
        // r = 0 stops at the first entry.
        let picked = sample_without_replacement(pool, 2, &mut rng);
        assert_eq!(picked, vec![1, 3]);
    }

    #[test]
    fn first_pick_follows_first_crossing() {
        // seed 0: first u = 1013904223 / 2^32 ≈ 0.236
        let mut rng = Lcg::new(0);
        let pool = vec![(10, 1.0), (20, 1.0), (30, 1.0), (40, 1.0)];
        // r ≈ 0.944 of total 4: crosses zero at the first entry.
        assert_eq!(sample_without_replacement(pool, 1, &mut rng), vec![10]);
    }

    #[test]
    fn sampler_is_deterministic_per_seed() {
        let weights = WeightVector::from_fn(|n| f64::from(n));
        let sampler = WeightedSampler::new(&weights);
        let a = sampler.tickets(5, &mut Lcg::new(99));
        let b = sampler.tickets(5, &mut Lcg::new(99));
        assert_eq!(a, b);
        assert!(a.iter().all(|t| t.len() == 6));
    }
}
