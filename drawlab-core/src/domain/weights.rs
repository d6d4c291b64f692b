//! Dense per-number weight vector over the candidate domain.

use serde::{Deserialize, Serialize};

use super::draw::DOMAIN_SIZE;

/// One non-negative score per candidate number `1..=60`.
///
/// Not normalized unless produced by [`WeightVector::normalized`]. Stored as a
/// `Vec` of fixed length; index `n - 1` holds the weight of number `n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn zeros() -> Self {
        Self(vec![0.0; DOMAIN_SIZE])
    }

    pub fn filled(value: f64) -> Self {
        Self(vec![value; DOMAIN_SIZE])
    }

    /// Equal weights summing to one.
    pub fn uniform() -> Self {
        Self::filled(1.0 / DOMAIN_SIZE as f64)
    }

    pub fn from_fn(mut f: impl FnMut(u8) -> f64) -> Self {
        Self((1..=DOMAIN_SIZE as u8).map(&mut f).collect())
    }

    pub fn get(&self, number: u8) -> f64 {
        self.0[number as usize - 1]
    }

    pub fn add(&mut self, number: u8, amount: f64) {
        self.0[number as usize - 1] += amount;
    }

    pub fn scale(&mut self, number: u8, factor: f64) {
        self.0[number as usize - 1] *= factor;
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// `(number, weight)` pairs in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.0.iter().enumerate().map(|(i, &w)| (i as u8 + 1, w))
    }

    /// Divide by the total. A vector with no positive mass becomes uniform.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total > 0.0 {
            Self(self.0.iter().map(|w| w / total).collect())
        } else {
            Self::uniform()
        }
    }

    /// The `n` highest-weighted numbers. Equal weights rank the lower number first.
    pub fn top_n(&self, n: usize) -> Vec<u8> {
        let mut ranked: Vec<(u8, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(n).map(|(num, _)| num).collect()
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::zeros()
    }
}
