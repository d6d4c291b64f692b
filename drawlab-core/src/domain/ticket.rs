//! Ticket: one sampled candidate set, plus the metrics computed on it.

use serde::{Deserialize, Serialize};

/// Entropy bins: `[1,10]`, `[11,20]`, ..., `[51,60]`.
pub const ENTROPY_BINS: usize = 6;
pub const BIN_WIDTH: u8 = 10;

/// Distinct numbers in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(Vec<u8>);

impl Ticket {
    pub fn new(mut numbers: Vec<u8>) -> Self {
        numbers.sort_unstable();
        Self(numbers)
    }

    pub fn numbers(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How many of this ticket's numbers were actually drawn.
    pub fn hits(&self, actual: &[u8]) -> usize {
        self.0.iter().filter(|n| actual.contains(n)).count()
    }

    /// Shannon entropy (bits) of the ticket's spread over the six decade bins,
    /// rounded to 3 decimals.
    pub fn entropy(&self) -> f64 {
        bin_entropy(&self.0)
    }
}

pub fn bin_entropy(numbers: &[u8]) -> f64 {
    if numbers.is_empty() {
        return 0.0;
    }
    let mut bins = [0usize; ENTROPY_BINS];
    for &n in numbers {
        let idx = (n.saturating_sub(1) / BIN_WIDTH) as usize;
        bins[idx.min(ENTROPY_BINS - 1)] += 1;
    }
    let total = numbers.len() as f64;
    let entropy: f64 = bins
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    round3(entropy)
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_ticket_has_max_entropy() {
        let t = Ticket::new(vec![5, 15, 25, 35, 45, 55]);
        assert_eq!(t.entropy(), 2.585);
    }

    #[test]
    fn clustered_ticket_has_zero_entropy() {
        let t = Ticket::new(vec![1, 2, 3, 4, 5, 10]);
        assert_eq!(t.entropy(), 0.0);
    }

    #[test]
    fn bin_edges() {
        // 10 and 11 fall in different bins; 60 lands in the last one.
        let t = Ticket::new(vec![10, 11, 20, 21, 59, 60]);
        // three bins of two: -3 * (1/3) * log2(1/3) = log2(3)
        assert_eq!(t.entropy(), 1.585);
    }

    #[test]
    fn hits_counts_intersection() {
        let t = Ticket::new(vec![9, 3, 1, 40, 22, 17]);
        assert_eq!(t.numbers(), &[1, 3, 9, 17, 22, 40]);
        assert_eq!(t.hits(&[1, 2, 3, 4, 5, 6]), 2);
        assert_eq!(t.hits(&[50, 51, 52, 53, 54, 55]), 0);
    }
}
