//! Forward forecast for a draw that has not happened yet.
//!
//! Scores are evolved over the whole history exactly as the backtest would,
//! without sampling. The final coefficients then weight the components of the
//! latest window, computed against the target's features.

use serde::{Deserialize, Serialize};

use crate::components::{AdaptiveBlender, Coefficients, ComponentWeights, HotCold, WeightedSampler};
use crate::domain::{Draw, DrawFeatures, Ticket, WeightVector};
use crate::rng::Lcg;

use super::params::{ParamError, WeightingParams};
use super::{check_chronological, window, EngineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastOptions {
    pub tickets: usize,
    pub min_history: usize,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            tickets: 20,
            min_history: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTicket {
    pub ticket: Ticket,
    pub entropy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub coefficients: Coefficients,
    pub hot_numbers: Vec<u8>,
    pub cold_numbers: Vec<u8>,
    pub weights: WeightVector,
    pub tickets: Vec<ScoredTicket>,
}

/// Forecast tickets for the draw following `draws`.
///
/// With fewer than `min_history` draws no scores are evolved and the
/// coefficients stay equal.
pub fn forecast(
    draws: &[Draw],
    target: Option<&DrawFeatures>,
    params: &WeightingParams,
    options: &ForecastOptions,
    seed: u32,
) -> Result<Forecast, EngineError> {
    params.validate()?;
    if options.tickets == 0 {
        return Err(ParamError::Zero("tickets").into());
    }
    check_chronological(draws)?;

    let mut blender = AdaptiveBlender::new(params.blend_params());
    for i in options.min_history..draws.len() {
        let components = ComponentWeights::compute(
            window(draws, i, params.window_size),
            draws[i].features.as_ref(),
            params.half_life,
            &params.feature_weights,
        );
        blender.observe(&components, draws[i].numbers());
    }
    let coefficients = blender.coefficients();

    let latest = window(draws, draws.len(), params.window_size);
    let components =
        ComponentWeights::compute(latest, target, params.half_life, &params.feature_weights);
    let hot_cold = HotCold::classify(latest, params.cold_window);
    let weights = blender.blend(&components, &coefficients, &hot_cold);

    let mut rng = Lcg::new(seed);
    let tickets = WeightedSampler::new(&weights)
        .tickets(options.tickets, &mut rng)
        .into_iter()
        .map(|ticket| ScoredTicket {
            entropy: ticket.entropy(),
            ticket,
        })
        .collect();

    Ok(Forecast {
        coefficients,
        hot_numbers: hot_cold.hot,
        cold_numbers: hot_cold.cold,
        weights,
        tickets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BacktestRunner, RunOptions};
    use chrono::NaiveDate;

    fn history(count: u32) -> Vec<Draw> {
        let start = NaiveDate::from_ymd_opt(2019, 2, 1).unwrap();
        (1..=count)
            .map(|id| {
                let a = ((id * 11) % 55) as i64 + 1;
                Draw::new(
                    id,
                    start + chrono::Duration::days(id as i64 * 4),
                    &[a, a + 1, a + 2, a + 3, a + 4, a + 5],
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn produces_requested_tickets() {
        let draws = history(80);
        let options = ForecastOptions {
            tickets: 5,
            min_history: 20,
        };
        let f = forecast(&draws, None, &WeightingParams::default(), &options, 42).unwrap();
        assert_eq!(f.tickets.len(), 5);
        assert!((f.weights.sum() - 1.0).abs() < 1e-12);
        assert!((f.coefficients.sum() - 1.0).abs() < 1e-12);
        for t in &f.tickets {
            assert_eq!(t.ticket.len(), 6);
            assert_eq!(t.entropy, t.ticket.entropy());
        }
    }

    #[test]
    fn coefficients_match_backtest_scores() {
        let draws = history(60);
        let params = WeightingParams::default();
        let run = BacktestRunner::new(
            params.clone(),
            RunOptions {
                min_history: 20,
                ..Default::default()
            },
        )
        .unwrap()
        .run(&draws, 1)
        .unwrap();
        let last = run.results.last().map(|r| r.coefficients).unwrap();

        let options = ForecastOptions {
            tickets: 1,
            min_history: 20,
        };
        let f = forecast(&draws, None, &params, &options, 1).unwrap();
        assert_eq!(f.coefficients, last);
    }

    #[test]
    fn short_history_keeps_equal_coefficients() {
        let draws = history(10);
        let f = forecast(
            &draws,
            None,
            &WeightingParams::default(),
            &ForecastOptions::default(),
            3,
        )
        .unwrap();
        assert_eq!(f.coefficients, Coefficients::default());
    }

    #[test]
    fn zero_tickets_rejected() {
        let options = ForecastOptions {
            tickets: 0,
            min_history: 0,
        };
        let err = forecast(&[], None, &WeightingParams::default(), &options, 0).unwrap_err();
        assert_eq!(err, EngineError::Params(ParamError::Zero("tickets")));
    }
}
