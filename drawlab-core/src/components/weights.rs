//! Weight components: four independent per-number scores over a window.
//!
//! - `base`: uniform prior (all ones)
//! - `freq`: occurrence count
//! - `recency`: occurrences decayed by `exp(-age / half_life)`, newest age 1
//! - `astro`: feature similarity of each window draw to the target, credited
//!   to all six of that draw's numbers

use serde::Serialize;

use crate::domain::{Draw, DrawFeatures, FeatureWeights, WeightVector};

/// The three components that compete for blending weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Frequency,
    Recency,
    Astro,
}

impl Component {
    pub const PREDICTIVE: [Component; 3] = [Self::Frequency, Self::Recency, Self::Astro];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentWeights {
    pub base: WeightVector,
    pub freq: WeightVector,
    pub recency: WeightVector,
    pub astro: WeightVector,
}

impl ComponentWeights {
    /// Compute all four components for `window` (oldest first) against the
    /// target's features. `half_life` must be positive; parameter validation
    /// guarantees it for engine callers.
    pub fn compute(
        window: &[Draw],
        target: Option<&DrawFeatures>,
        half_life: f64,
        feature_weights: &FeatureWeights,
    ) -> Self {
        let mut freq = WeightVector::zeros();
        let mut recency = WeightVector::zeros();
        let mut astro = WeightVector::zeros();

        let len = window.len();
        for (i, draw) in window.iter().enumerate() {
            let age = (len - i) as f64;
            let decay = (-age / half_life).exp();
            for &n in draw.numbers() {
                freq.add(n, 1.0);
                recency.add(n, decay);
            }

            let similarity = match (target, draw.features.as_ref()) {
                (Some(t), Some(f)) => t.similarity(f, feature_weights),
                _ => 0.0,
            };
            if similarity > 0.0 {
                for &n in draw.numbers() {
                    astro.add(n, similarity);
                }
            }
        }

        Self {
            base: WeightVector::filled(1.0),
            freq,
            recency,
            astro,
        }
    }

    pub fn get(&self, component: Component) -> &WeightVector {
        match component {
            Component::Frequency => &self.freq,
            Component::Recency => &self.recency,
            Component::Astro => &self.astro,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LunarPhase, ZodiacSign};
    use chrono::NaiveDate;

    fn draw(id: u32, numbers: &[i64], features: Option<DrawFeatures>) -> Draw {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(id as i64);
        Draw::new(id, date, numbers, features).unwrap()
    }

    #[test]
    fn single_draw_window() {
        let window = vec![draw(1, &[1, 2, 3, 4, 5, 6], None)];
        let c = ComponentWeights::compute(&window, None, 20.0, &FeatureWeights::default());

        let decay = (-1.0f64 / 20.0).exp();
        for n in 1..=6 {
            assert_eq!(c.freq.get(n), 1.0);
            assert!((c.recency.get(n) - decay).abs() < 1e-15);
        }
        for n in 7..=60 {
            assert_eq!(c.freq.get(n), 0.0);
            assert_eq!(c.recency.get(n), 0.0);
        }
        assert_eq!(c.astro, WeightVector::zeros());
        assert_eq!(c.base, WeightVector::filled(1.0));
    }

    #[test]
    fn newest_draw_has_age_one() {
        let window = vec![
            draw(1, &[1, 2, 3, 4, 5, 6], None),
            draw(2, &[7, 8, 9, 10, 11, 12], None),
        ];
        let c = ComponentWeights::compute(&window, None, 10.0, &FeatureWeights::default());
        assert!((c.recency.get(7) - (-0.1f64).exp()).abs() < 1e-15);
        assert!((c.recency.get(1) - (-0.2f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn empty_window_has_no_signal() {
        let c = ComponentWeights::compute(&[], None, 20.0, &FeatureWeights::default());
        assert_eq!(c.freq.sum(), 0.0);
        assert_eq!(c.recency.sum(), 0.0);
        assert_eq!(c.astro.sum(), 0.0);
        assert_eq!(c.base.sum(), 60.0);
    }

    #[test]
    fn astro_credits_match_count_to_all_numbers() {
        let target = DrawFeatures {
            lunar_phase: Some(LunarPhase::FullMoon),
            moon_sign: Some(ZodiacSign::Aries),
            weekday_index: Some(3),
            ..Default::default()
        };
        let two_matches = DrawFeatures {
            lunar_phase: Some(LunarPhase::FullMoon),
            moon_sign: Some(ZodiacSign::Taurus),
            weekday_index: Some(3),
            ..Default::default()
        };
        let no_match = DrawFeatures {
            lunar_phase: Some(LunarPhase::NewMoon),
            ..Default::default()
        };
        let window = vec![
            draw(1, &[1, 2, 3, 4, 5, 6], Some(two_matches.clone())),
            draw(2, &[1, 20, 30, 40, 50, 60], Some(two_matches)),
            draw(3, &[11, 12, 13, 14, 15, 16], Some(no_match)),
            draw(4, &[21, 22, 23, 24, 25, 26], None),
        ];
        let c = ComponentWeights::compute(&window, Some(&target), 20.0, &FeatureWeights::default());

        assert_eq!(c.astro.get(1), 4.0);
        assert_eq!(c.astro.get(2), 2.0);
        assert_eq!(c.astro.get(60), 2.0);
        assert_eq!(c.astro.get(11), 0.0);
        assert_eq!(c.astro.get(21), 0.0);
    }

    #[test]
    fn target_without_features_gives_zero_astro() {
        let features = DrawFeatures {
            weekday_index: Some(1),
            ..Default::default()
        };
        let window = vec![draw(1, &[1, 2, 3, 4, 5, 6], Some(features))];
        let c = ComponentWeights::compute(&window, None, 20.0, &FeatureWeights::default());
        assert_eq!(c.astro.sum(), 0.0);
    }
}
