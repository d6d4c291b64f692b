//! Draw-by-draw backtest loop.
//!
//! One [`AdaptiveBlender`] and one [`Lcg`] live for the whole run: scores carry
//! over between targets and every ticket of every draw comes from the same
//! stream, so a run is fully determined by its parameters, options and seed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::components::{AdaptiveBlender, Coefficients, ComponentWeights, HotCold, WeightedSampler};
use crate::domain::{round3, Draw, Ticket};
use crate::rng::Lcg;

use super::accumulator::{HitAccumulator, HitRates};
use super::params::{RunOptions, WeightingParams};
use super::{check_chronological, window, EngineError};

/// Everything recorded for one target draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: u32,
    pub date: NaiveDate,
    pub actual: Vec<u8>,
    pub hot_numbers: Vec<u8>,
    pub cold_numbers: Vec<u8>,
    pub tickets: Vec<Ticket>,
    pub hits: Vec<usize>,
    pub entropies: Vec<f64>,
    pub best_hits: usize,
    /// Rounded to 3 decimals; the accumulator keeps the exact mean.
    pub avg_hits: f64,
    pub coefficients: Coefficients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub window_size: usize,
    pub tickets_per_draw: usize,
    pub half_life: f64,
    pub explore: f64,
    pub min_history: usize,
    pub cold_window: usize,
    pub hot_boost: f64,
    pub cold_boost: f64,
    pub seed: u32,
    pub total_draws: u64,
    pub avg_best_hits: f64,
    pub avg_avg_hits: f64,
    pub pct_at_least_2: f64,
    pub pct_at_least_3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub summary: RunSummary,
    pub results: Vec<DrawRecord>,
    #[serde(skip)]
    pub accumulator: HitAccumulator,
}

/// Per-target output of the loop, before it is turned into a record.
struct Evaluation {
    hot_cold: HotCold,
    tickets: Vec<Ticket>,
    hits: Vec<usize>,
    best_hits: usize,
    avg_hits: f64,
    coefficients: Coefficients,
}

/// Validated backtest configuration.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
    params: WeightingParams,
    options: RunOptions,
}

impl BacktestRunner {
    pub fn new(params: WeightingParams, options: RunOptions) -> Result<Self, EngineError> {
        params.validate()?;
        options.validate()?;
        Ok(Self { params, options })
    }

    pub fn params(&self) -> &WeightingParams {
        &self.params
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Full run with a record per evaluated draw.
    pub fn run(&self, draws: &[Draw], seed: u32) -> Result<BacktestRun, EngineError> {
        let mut results = Vec::new();
        let accumulator = self.drive(draws, seed, |draw, eval| {
            results.push(DrawRecord {
                id: draw.id,
                date: draw.date,
                actual: draw.numbers().to_vec(),
                hot_numbers: eval.hot_cold.hot,
                cold_numbers: eval.hot_cold.cold,
                entropies: eval.tickets.iter().map(Ticket::entropy).collect(),
                tickets: eval.tickets,
                hits: eval.hits,
                best_hits: eval.best_hits,
                avg_hits: round3(eval.avg_hits),
                coefficients: eval.coefficients,
            });
        })?;

        Ok(BacktestRun {
            summary: self.summary(seed, &accumulator),
            results,
            accumulator,
        })
    }

    /// Counters only. Used by tuning, where per-draw records are not kept.
    pub fn accumulate(&self, draws: &[Draw], seed: u32) -> Result<HitAccumulator, EngineError> {
        self.drive(draws, seed, |_, _| {})
    }

    pub fn summary(&self, seed: u32, accumulator: &HitAccumulator) -> RunSummary {
        let HitRates {
            avg_best_hits,
            avg_avg_hits,
            pct_at_least_2,
            pct_at_least_3,
        } = accumulator.rates();
        RunSummary {
            window_size: self.params.window_size,
            tickets_per_draw: self.options.tickets_per_draw,
            half_life: self.params.half_life,
            explore: self.params.explore,
            min_history: self.options.min_history,
            cold_window: self.params.cold_window,
            hot_boost: self.params.hot_boost,
            cold_boost: self.params.cold_boost,
            seed,
            total_draws: accumulator.count,
            avg_best_hits,
            avg_avg_hits,
            pct_at_least_2,
            pct_at_least_3,
        }
    }

    fn drive(
        &self,
        draws: &[Draw],
        seed: u32,
        mut on_draw: impl FnMut(&Draw, Evaluation),
    ) -> Result<HitAccumulator, EngineError> {
        check_chronological(draws)?;

        let mut accumulator = HitAccumulator::default();
        if draws.len() < self.options.min_history {
            warn!(
                draws = draws.len(),
                min_history = self.options.min_history,
                "insufficient history, nothing to evaluate"
            );
            return Ok(accumulator);
        }

        let mut blender = AdaptiveBlender::new(self.params.blend_params());
        let mut rng = Lcg::new(seed);

        for i in self.options.targets(draws.len()) {
            let target = &draws[i];
            let eval = self.evaluate(draws, i, &mut blender, &mut rng);
            accumulator.record(&eval.hits);
            on_draw(target, eval);
        }

        Ok(accumulator)
    }

    fn evaluate(
        &self,
        draws: &[Draw],
        index: usize,
        blender: &mut AdaptiveBlender,
        rng: &mut Lcg,
    ) -> Evaluation {
        let target = &draws[index];
        let actual = target.numbers();
        let window = window(draws, index, self.params.window_size);

        let components = ComponentWeights::compute(
            window,
            target.features.as_ref(),
            self.params.half_life,
            &self.params.feature_weights,
        );
        let hot_cold = HotCold::classify(window, self.params.cold_window);
        let outcome = blender.step(&components, actual, &hot_cold);

        let tickets = WeightedSampler::new(&outcome.weights).tickets(self.options.tickets_per_draw, rng);
        let hits: Vec<usize> = tickets.iter().map(|t| t.hits(actual)).collect();
        let best_hits = hits.iter().copied().max().unwrap_or(0);
        let avg_hits = hits.iter().sum::<usize>() as f64 / hits.len().max(1) as f64;

        Evaluation {
            hot_cold,
            tickets,
            hits,
            best_hits,
            avg_hits,
            coefficients: outcome.coefficients,
        }
    }
}
