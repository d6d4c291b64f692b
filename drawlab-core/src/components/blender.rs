//! Adaptive blending of the weight components.
//!
//! Each component earns a running score from how many of the drawn numbers
//! its own top six contained. Scores decay by [`SCORE_DECAY`] per draw and are
//! normalized into the coefficients that mix the components. The mixed vector
//! is then blended with the uniform base (exploration) and adjusted by the
//! hot/cold classification.

use serde::{Deserialize, Serialize};

use super::hot_cold::HotCold;
use super::weights::{Component, ComponentWeights};
use crate::domain::{WeightVector, TICKET_SIZE};

/// Per-draw retention of a component's previous score.
pub const SCORE_DECAY: f64 = 0.9;

/// How many of `actual` appear among the six highest-weighted numbers of
/// `weights`. Ties rank the lower number first.
pub fn top_six_hits(weights: &WeightVector, actual: &[u8]) -> u32 {
    weights
        .top_n(TICKET_SIZE)
        .into_iter()
        .filter(|n| actual.contains(n))
        .count() as u32
}

/// Top-six hit counts of the three predictive components for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentHits {
    pub freq: u32,
    pub recency: u32,
    pub astro: u32,
}

impl ComponentHits {
    pub fn score(components: &ComponentWeights, actual: &[u8]) -> Self {
        Self {
            freq: top_six_hits(components.get(Component::Frequency), actual),
            recency: top_six_hits(components.get(Component::Recency), actual),
            astro: top_six_hits(components.get(Component::Astro), actual),
        }
    }
}

/// Running component scores. A fresh state is `(1, 1, 1)`, so every score
/// stays strictly positive for any sequence of non-negative hits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub freq: f64,
    pub recency: f64,
    pub astro: f64,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            freq: 1.0,
            recency: 1.0,
            astro: 1.0,
        }
    }
}

impl ScoreState {
    pub fn update(&mut self, hits: ComponentHits) {
        self.freq = self.freq * SCORE_DECAY + f64::from(hits.freq);
        self.recency = self.recency * SCORE_DECAY + f64::from(hits.recency);
        self.astro = self.astro * SCORE_DECAY + f64::from(hits.astro);
    }

    pub fn coefficients(&self) -> Coefficients {
        let total = self.freq + self.recency + self.astro;
        Coefficients {
            freq: self.freq / total,
            recency: self.recency / total,
            astro: self.astro / total,
        }
    }
}

/// Mixing coefficients; non-negative and summing to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub freq: f64,
    pub recency: f64,
    pub astro: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        ScoreState::default().coefficients()
    }
}

impl Coefficients {
    pub fn sum(&self) -> f64 {
        self.freq + self.recency + self.astro
    }

    /// `Σ coeff_c * component_c[n]` for every number (not normalized).
    pub fn mix(&self, components: &ComponentWeights) -> WeightVector {
        WeightVector::from_fn(|n| {
            self.freq * components.freq.get(n)
                + self.recency * components.recency.get(n)
                + self.astro * components.astro.get(n)
        })
    }
}

/// Exploration and hot/cold settings applied after mixing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendParams {
    pub explore: f64,
    pub hot_boost: f64,
    pub cold_boost: f64,
}

/// Result of one blending step.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendOutcome {
    pub weights: WeightVector,
    pub coefficients: Coefficients,
    pub hits: ComponentHits,
}

/// Owns the score state for one run and turns component vectors into final
/// sampling weights.
#[derive(Debug, Clone)]
pub struct AdaptiveBlender {
    params: BlendParams,
    scores: ScoreState,
}

impl AdaptiveBlender {
    pub fn new(params: BlendParams) -> Self {
        Self {
            params,
            scores: ScoreState::default(),
        }
    }

    pub fn params(&self) -> &BlendParams {
        &self.params
    }

    pub fn scores(&self) -> &ScoreState {
        &self.scores
    }

    pub fn coefficients(&self) -> Coefficients {
        self.scores.coefficients()
    }

    /// Score the components against the drawn numbers and fold the hits into
    /// the running state.
    pub fn observe(&mut self, components: &ComponentWeights, actual: &[u8]) -> ComponentHits {
        let hits = ComponentHits::score(components, actual);
        self.scores.update(hits);
        hits
    }

    /// Mix with `coefficients`, blend with the base at the exploration rate,
    /// then apply the hot/cold adjustment. The result sums to one.
    pub fn blend(
        &self,
        components: &ComponentWeights,
        coefficients: &Coefficients,
        hot_cold: &HotCold,
    ) -> WeightVector {
        let mixed = coefficients.mix(components).normalized();
        let base = components.base.normalized();
        let explore = self.params.explore;

        let blended = WeightVector::from_fn(|n| {
            mixed.get(n) * (1.0 - explore) + base.get(n) * explore
        });
        hot_cold.apply(&blended, self.params.hot_boost, self.params.cold_boost)
    }

    /// One backtest step: observe the true numbers, derive coefficients from
    /// the updated scores, and blend.
    pub fn step(
        &mut self,
        components: &ComponentWeights,
        actual: &[u8],
        hot_cold: &HotCold,
    ) -> BlendOutcome {
        let hits = self.observe(components, actual);
        let coefficients = self.coefficients();
        let weights = self.blend(components, &coefficients, hot_cold);
        BlendOutcome {
            weights,
            coefficients,
            hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Draw, FeatureWeights};
    use chrono::NaiveDate;

    fn draw(id: u32, numbers: &[i64]) -> Draw {
        Draw::new(id, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), numbers, None).unwrap()
    }

    fn params() -> BlendParams {
        BlendParams {
            explore: 0.1,
            hot_boost: 0.05,
            cold_boost: 0.1,
        }
    }

    #[test]
    fn fresh_state_gives_equal_coefficients() {
        let c = ScoreState::default().coefficients();
        assert!((c.freq - 1.0 / 3.0).abs() < 1e-15);
        assert!((c.sum() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn update_decays_then_adds() {
        let mut s = ScoreState::default();
        s.update(ComponentHits {
            freq: 2,
            recency: 0,
            astro: 1,
        });
        assert!((s.freq - 2.9).abs() < 1e-12);
        assert!((s.recency - 0.9).abs() < 1e-12);
        assert!((s.astro - 1.9).abs() < 1e-12);

        let c = s.coefficients();
        assert!((c.freq - 2.9 / 5.7).abs() < 1e-12);
    }

    #[test]
    fn top_six_hits_uses_ascending_tiebreak() {
        // All-zero vector: top six is 1..=6.
        let zeros = WeightVector::zeros();
        assert_eq!(top_six_hits(&zeros, &[1, 2, 3, 40, 50, 60]), 3);

        let mut v = WeightVector::zeros();
        v.add(60, 1.0);
        assert_eq!(top_six_hits(&v, &[60, 6]), 1);
        assert_eq!(top_six_hits(&v, &[60, 5]), 2);
    }

    #[test]
    fn step_updates_scores_before_coefficients() {
        let window = vec![draw(1, &[1, 2, 3, 4, 5, 6])];
        let comps = ComponentWeights::compute(&window, None, 20.0, &FeatureWeights::default());
        let hot_cold = HotCold::classify(&window, 25);
        let mut blender = AdaptiveBlender::new(params());

        let outcome = blender.step(&comps, &[1, 2, 3, 4, 5, 6], &hot_cold);
        assert_eq!(
            outcome.hits,
            ComponentHits {
                freq: 6,
                recency: 6,
                astro: 6
            }
        );
        // Astro is all zero, so its top six is 1..=6 as well.
        assert!((blender.scores().freq - 6.9).abs() < 1e-12);
        assert_eq!(outcome.coefficients, blender.coefficients());
        assert!((outcome.weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn full_exploration_ignores_components() {
        let window = vec![draw(1, &[1, 2, 3, 4, 5, 6])];
        let comps = ComponentWeights::compute(&window, None, 20.0, &FeatureWeights::default());
        let hot_cold = HotCold::classify(&window, 1);
        let blender = AdaptiveBlender::new(BlendParams {
            explore: 1.0,
            hot_boost: 0.0,
            cold_boost: 0.0,
        });
        let w = blender.blend(&comps, &Coefficients::default(), &hot_cold);
        for (_, weight) in w.iter() {
            assert!((weight - 1.0 / 60.0).abs() < 1e-15);
        }
    }

    #[test]
    fn empty_window_blends_to_uniform() {
        let comps = ComponentWeights::compute(&[], None, 20.0, &FeatureWeights::default());
        let hot_cold = HotCold::classify(&[], 25);
        let blender = AdaptiveBlender::new(params());
        let w = blender.blend(&comps, &Coefficients::default(), &hot_cold);
        // Everything is cold and equally boosted.
        for (_, weight) in w.iter() {
            assert!((weight - 1.0 / 60.0).abs() < 1e-15);
        }
    }
}
