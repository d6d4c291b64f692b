//! Mergeable hit counters and the rates derived from them.
//!
//! Partitioned runs produce one accumulator each; merging is plain integer
//! addition, and rates are always recomputed from the merged counters.
//! Averaging rates directly would weight partitions equally regardless of
//! their size, and summing per-draw float averages would make the result
//! depend on merge order.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::domain::TICKET_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitAccumulator {
    /// Sum over draws of the best ticket's hits.
    pub best_sum: u64,
    /// Sum of hits over every ticket of every draw.
    pub hit_sum: u64,
    /// Tickets generated over all draws.
    pub tickets: u64,
    pub count: u64,
    pub at_least_2: u64,
    pub at_least_3: u64,
}

impl HitAccumulator {
    /// Record one evaluated draw from the hits of each of its tickets.
    pub fn record(&mut self, hits: &[usize]) {
        let best_hits = hits.iter().copied().max().unwrap_or(0);
        self.best_sum += best_hits as u64;
        self.hit_sum += hits.iter().sum::<usize>() as u64;
        self.tickets += hits.len() as u64;
        self.count += 1;
        if best_hits >= 2 {
            self.at_least_2 += 1;
        }
        if best_hits >= 3 {
            self.at_least_3 += 1;
        }
    }

    pub fn merge(&mut self, other: &HitAccumulator) {
        self.best_sum += other.best_sum;
        self.hit_sum += other.hit_sum;
        self.tickets += other.tickets;
        self.count += other.count;
        self.at_least_2 += other.at_least_2;
        self.at_least_3 += other.at_least_3;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Counters that could have come from [`record`](Self::record):
    /// `at_least_3 <= at_least_2 <= count` and no ticket above six hits.
    pub fn is_consistent(&self) -> bool {
        let max_hits = TICKET_SIZE as u64;
        self.at_least_3 <= self.at_least_2
            && self.at_least_2 <= self.count
            && self.best_sum <= max_hits * self.count
            && self.hit_sum <= max_hits * self.tickets
    }

    /// `avg_avg_hits` is hits per ticket, which equals the mean of per-draw
    /// averages when every draw has the same ticket count.
    pub fn rates(&self) -> HitRates {
        if self.count == 0 {
            return HitRates::default();
        }
        let n = self.count as f64;
        HitRates {
            avg_best_hits: self.best_sum as f64 / n,
            avg_avg_hits: if self.tickets == 0 {
                0.0
            } else {
                self.hit_sum as f64 / self.tickets as f64
            },
            pct_at_least_2: self.at_least_2 as f64 / n,
            pct_at_least_3: self.at_least_3 as f64 / n,
        }
    }
}

impl AddAssign for HitAccumulator {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Add for HitAccumulator {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.merge(&rhs);
        self
    }
}

impl Sum for HitAccumulator {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a HitAccumulator> for HitAccumulator {
    fn sum<I: Iterator<Item = &'a HitAccumulator>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, x| {
            acc.merge(x);
            acc
        })
    }
}

/// Rates derived from a [`HitAccumulator`]. All zero for an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRates {
    pub avg_best_hits: f64,
    pub avg_avg_hits: f64,
    pub pct_at_least_2: f64,
    pub pct_at_least_3: f64,
}
