//! Run parameters: the weighting configuration under test and the loop
//! options around it.
//!
//! Both structs are validated once, when a runner or forecast is built.
//! Everything downstream assumes valid values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::BlendParams;
use crate::domain::FeatureWeights;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("half_life must be positive and finite, got {0}")]
    HalfLife(f64),
    #[error("explore must be within [0, 1], got {0}")]
    Explore(f64),
    #[error("{name} must be finite and greater than -1, got {value}")]
    Boost { name: &'static str, value: f64 },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("feature weight {index} must be finite and non-negative, got {value}")]
    FeatureWeight { index: usize, value: f64 },
}

/// The six tunable values plus the astro feature weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingParams {
    pub window_size: usize,
    pub half_life: f64,
    pub explore: f64,
    pub hot_boost: f64,
    pub cold_boost: f64,
    /// Hot/cold lookback, in draws at the end of the window.
    pub cold_window: usize,
    #[serde(default)]
    pub feature_weights: FeatureWeights,
}

impl Default for WeightingParams {
    fn default() -> Self {
        Self {
            window_size: 200,
            half_life: 20.0,
            explore: 0.1,
            hot_boost: 0.05,
            cold_boost: 0.1,
            cold_window: 25,
            feature_weights: FeatureWeights::default(),
        }
    }
}

impl WeightingParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.window_size == 0 {
            return Err(ParamError::Zero("window_size"));
        }
        if self.cold_window == 0 {
            return Err(ParamError::Zero("cold_window"));
        }
        if !(self.half_life.is_finite() && self.half_life > 0.0) {
            return Err(ParamError::HalfLife(self.half_life));
        }
        if !(0.0..=1.0).contains(&self.explore) {
            return Err(ParamError::Explore(self.explore));
        }
        for (name, value) in [("hot_boost", self.hot_boost), ("cold_boost", self.cold_boost)] {
            if !(value.is_finite() && value > -1.0) {
                return Err(ParamError::Boost { name, value });
            }
        }
        for (index, &value) in self.feature_weights.0.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamError::FeatureWeight { index, value });
            }
        }
        Ok(())
    }

    pub fn blend_params(&self) -> BlendParams {
        BlendParams {
            explore: self.explore,
            hot_boost: self.hot_boost,
            cold_boost: self.cold_boost,
        }
    }
}

/// Loop options: how many tickets per draw and which target indices to visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub tickets_per_draw: usize,
    pub min_history: usize,
    pub stride: usize,
    /// First target index; clamped up to `min_history`.
    pub start_idx: Option<usize>,
    /// One past the last target index; clamped down to the draw count.
    pub end_idx: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tickets_per_draw: 10,
            min_history: 50,
            stride: 1,
            start_idx: None,
            end_idx: None,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.tickets_per_draw == 0 {
            return Err(ParamError::Zero("tickets_per_draw"));
        }
        if self.stride == 0 {
            return Err(ParamError::Zero("stride"));
        }
        Ok(())
    }

    /// Resolved `(start, end)` for a sequence of `len` draws. `start >= end`
    /// means there is nothing to evaluate.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let start = self.start_idx.unwrap_or(self.min_history).max(self.min_history);
        let end = self.end_idx.unwrap_or(len).min(len);
        (start, end)
    }

    /// Target indices visited for a sequence of `len` draws.
    pub fn targets(&self, len: usize) -> impl Iterator<Item = usize> {
        let (start, end) = self.bounds(len);
        (start..end.max(start)).step_by(self.stride.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(WeightingParams::default().validate(), Ok(()));
        assert_eq!(RunOptions::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_values() {
        let base = WeightingParams::default();

        let p = WeightingParams { half_life: 0.0, ..base.clone() };
        assert_eq!(p.validate(), Err(ParamError::HalfLife(0.0)));

        let p = WeightingParams { explore: 1.5, ..base.clone() };
        assert_eq!(p.validate(), Err(ParamError::Explore(1.5)));

        let p = WeightingParams { cold_boost: -1.0, ..base.clone() };
        assert_eq!(
            p.validate(),
            Err(ParamError::Boost { name: "cold_boost", value: -1.0 })
        );

        let p = WeightingParams { cold_window: 0, ..base.clone() };
        assert_eq!(p.validate(), Err(ParamError::Zero("cold_window")));

        let mut p = base;
        p.feature_weights.0[3] = -0.5;
        assert_eq!(
            p.validate(),
            Err(ParamError::FeatureWeight { index: 3, value: -0.5 })
        );
    }

    #[test]
    fn nan_explore_is_rejected() {
        let p = WeightingParams { explore: f64::NAN, ..Default::default() };
        assert!(matches!(p.validate(), Err(ParamError::Explore(_))));
    }

    #[test]
    fn bounds_clamp_to_history_and_length() {
        let opts = RunOptions { min_history: 50, ..Default::default() };
        assert_eq!(opts.bounds(300), (50, 300));

        let opts = RunOptions {
            min_history: 50,
            start_idx: Some(10),
            end_idx: Some(500),
            ..Default::default()
        };
        assert_eq!(opts.bounds(300), (50, 300));

        let opts = RunOptions {
            min_history: 50,
            start_idx: Some(100),
            end_idx: Some(200),
            ..Default::default()
        };
        assert_eq!(opts.bounds(300), (100, 200));
    }

    #[test]
    fn targets_follow_stride() {
        let opts = RunOptions { min_history: 2, stride: 3, ..Default::default() };
        assert_eq!(opts.targets(10).collect::<Vec<_>>(), vec![2, 5, 8]);
    }

    #[test]
    fn short_history_has_no_targets() {
        let opts = RunOptions::default();
        assert_eq!(opts.targets(30).count(), 0);
    }
}
