//! Hot/cold classification over the tail of a window.

use serde::{Deserialize, Serialize};

use crate::domain::{Draw, WeightVector, DOMAIN_SIZE};

/// Partition of `1..=60`: `hot` appeared in the last `lookback` draws of the
/// window, `cold` did not. Both lists are ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotCold {
    pub hot: Vec<u8>,
    pub cold: Vec<u8>,
}

impl HotCold {
    /// `lookback >= window.len()` uses the whole window.
    pub fn classify(window: &[Draw], lookback: usize) -> Self {
        let recent = &window[window.len().saturating_sub(lookback)..];
        let mut seen = [false; DOMAIN_SIZE + 1];
        for draw in recent {
            for &n in draw.numbers() {
                seen[n as usize] = true;
            }
        }

        let (hot, cold) = (1..=DOMAIN_SIZE as u8).partition(|&n| seen[n as usize]);
        Self { hot, cold }
    }

    /// Multiply hot numbers by `1 + hot_boost` and cold numbers by
    /// `1 + cold_boost`, then renormalize.
    pub fn apply(&self, weights: &WeightVector, hot_boost: f64, cold_boost: f64) -> WeightVector {
        let mut adjusted = weights.clone();
        for &n in &self.hot {
            adjusted.scale(n, 1.0 + hot_boost);
        }
        for &n in &self.cold {
            adjusted.scale(n, 1.0 + cold_boost);
        }
        adjusted.normalized()
    }
}
