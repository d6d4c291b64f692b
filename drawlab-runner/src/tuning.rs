//! Parameter search: grid, curated candidates and random trials.
//!
//! Every configuration is backtested once with its own seed,
//! `seed + seed_offset` (wrapping). Offsets are allocated per group so they
//! never collide:
//!
//! - grid: `0, 1, 2, ...`
//! - candidates: from `max(1000, grid_len)`
//! - random: from `candidate_base + max(1000, candidates_len)`
//!
//! Configurations within a group are independent and run in parallel; results
//! are collected in configuration order before sorting, so the report does not
//! depend on the thread count.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use drawlab_core::domain::{round3, Draw, FeatureWeights};
use drawlab_core::engine::{BacktestRunner, EngineError, ParamError, RunOptions, WeightingParams};
use drawlab_core::fingerprint::dataset_hash;
use drawlab_core::rng::offset_seed;

use crate::result::{
    config_identity, sort_results, SearchGroup, TuningReport, TuningResult, TuningSummary,
};
use crate::runner::SCHEMA_VERSION;

/// Minimum spacing between the first offsets of consecutive groups.
pub const GROUP_OFFSET_SPACING: u32 = 1000;

#[derive(Debug, Error)]
pub enum TuneError {
    #[error("{group} configuration {index} is invalid: {source}")]
    InvalidConfig {
        group: SearchGroup,
        index: usize,
        #[source]
        source: ParamError,
    },
    #[error("{group} configuration {index} repeats configuration {first}")]
    DuplicateConfig {
        group: SearchGroup,
        index: usize,
        first: usize,
    },
    #[error("random range for {field} is empty: [{min}, {max}]")]
    EmptyRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("invalid run options: {0}")]
    Options(#[source] ParamError),
    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),
}

/// The six tunable values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningParams {
    pub window_size: usize,
    pub half_life: f64,
    pub explore: f64,
    pub hot_boost: f64,
    pub cold_boost: f64,
    pub cold_window: usize,
}

impl TuningParams {
    pub fn weighting(&self, feature_weights: &FeatureWeights) -> WeightingParams {
        WeightingParams {
            window_size: self.window_size,
            half_life: self.half_life,
            explore: self.explore,
            hot_boost: self.hot_boost,
            cold_boost: self.cold_boost,
            cold_window: self.cold_window,
            feature_weights: *feature_weights,
        }
    }
}

/// Named configuration evaluated as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub window_size: usize,
    pub half_life: f64,
    pub explore: f64,
    pub hot_boost: f64,
    pub cold_boost: f64,
    pub cold_window: usize,
}

impl Candidate {
    fn new(name: &str, window_size: usize, half_life: f64, explore: f64, hot_boost: f64, cold_boost: f64, cold_window: usize) -> Self {
        Self {
            name: name.to_string(),
            window_size,
            half_life,
            explore,
            hot_boost,
            cold_boost,
            cold_window,
        }
    }

    pub fn params(&self) -> TuningParams {
        TuningParams {
            window_size: self.window_size,
            half_life: self.half_life,
            explore: self.explore,
            hot_boost: self.hot_boost,
            cold_boost: self.cold_boost,
            cold_window: self.cold_window,
        }
    }

    pub fn default_set() -> Vec<Candidate> {
        vec![
            Self::new("default", 100, 20.0, 0.15, 0.1, 0.2, 20),
            Self::new("low_explore", 120, 20.0, 0.08, 0.1, 0.18, 20),
            Self::new("large_window", 220, 25.0, 0.12, 0.08, 0.18, 25),
            Self::new("fast_decay", 100, 12.0, 0.18, 0.12, 0.2, 15),
            Self::new("cold_bias", 120, 20.0, 0.12, 0.05, 0.3, 25),
        ]
    }
}

/// Value lists whose Cartesian product forms the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub window_sizes: Vec<usize>,
    pub half_lives: Vec<f64>,
    pub explore: Vec<f64>,
    pub hot_boost: Vec<f64>,
    pub cold_boost: Vec<f64>,
    pub cold_windows: Vec<usize>,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            window_sizes: vec![80, 120, 200],
            half_lives: vec![10.0, 20.0, 30.0],
            explore: vec![0.1, 0.2],
            hot_boost: vec![0.05, 0.1],
            cold_boost: vec![0.1, 0.2],
            cold_windows: vec![15, 25],
        }
    }
}

impl GridSpec {
    pub fn size(&self) -> usize {
        self.window_sizes.len()
            * self.half_lives.len()
            * self.explore.len()
            * self.hot_boost.len()
            * self.cold_boost.len()
            * self.cold_windows.len()
    }

    /// All configurations, window size outermost and cold window innermost.
    pub fn expand(&self) -> Vec<TuningParams> {
        let mut configs = Vec::with_capacity(self.size());
        for &window_size in &self.window_sizes {
            for &half_life in &self.half_lives {
                for &explore in &self.explore {
                    for &hot_boost in &self.hot_boost {
                        for &cold_boost in &self.cold_boost {
                            for &cold_window in &self.cold_windows {
                                configs.push(TuningParams {
                                    window_size,
                                    half_life,
                                    explore,
                                    hot_boost,
                                    cold_boost,
                                    cold_window,
                                });
                            }
                        }
                    }
                }
            }
        }
        configs
    }
}

/// Inclusive `[min, max]` ranges for random trials. Integer fields are drawn
/// uniformly; float fields as `min + u * (max - min)` rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomRanges {
    pub window_size: [usize; 2],
    pub half_life: [usize; 2],
    pub explore: [f64; 2],
    pub hot_boost: [f64; 2],
    pub cold_boost: [f64; 2],
    pub cold_window: [usize; 2],
}

impl Default for RandomRanges {
    fn default() -> Self {
        Self {
            window_size: [60, 259],
            half_life: [8, 37],
            explore: [0.05, 0.30],
            hot_boost: [0.03, 0.18],
            cold_boost: [0.05, 0.35],
            cold_window: [10, 39],
        }
    }
}

impl RandomRanges {
    pub fn validate(&self) -> Result<(), TuneError> {
        let int_ranges = [
            ("window_size", self.window_size),
            ("half_life", self.half_life),
            ("cold_window", self.cold_window),
        ];
        for (field, [min, max]) in int_ranges {
            if min > max {
                return Err(TuneError::EmptyRange {
                    field,
                    min: min as f64,
                    max: max as f64,
                });
            }
        }
        let float_ranges = [
            ("explore", self.explore),
            ("hot_boost", self.hot_boost),
            ("cold_boost", self.cold_boost),
        ];
        for (field, [min, max]) in float_ranges {
            if !(min <= max) {
                return Err(TuneError::EmptyRange { field, min, max });
            }
        }
        Ok(())
    }

    /// `trials` configurations from a generator seeded with `seed`. Every
    /// partition of a chunked run uses the same seed and sees the same trials.
    pub fn sample(&self, trials: usize, seed: u32) -> Vec<TuningParams> {
        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        (0..trials)
            .map(|_| TuningParams {
                window_size: rng.gen_range(self.window_size[0]..=self.window_size[1]),
                half_life: rng.gen_range(self.half_life[0]..=self.half_life[1]) as f64,
                explore: scaled(&mut rng, self.explore),
                hot_boost: scaled(&mut rng, self.hot_boost),
                cold_boost: scaled(&mut rng, self.cold_boost),
                cold_window: rng.gen_range(self.cold_window[0]..=self.cold_window[1]),
            })
            .collect()
    }
}

fn scaled(rng: &mut StdRng, [min, max]: [f64; 2]) -> f64 {
    round3(min + rng.gen::<f64>() * (max - min))
}

/// Everything the harness searches over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub grid: GridSpec,
    pub candidates: Vec<Candidate>,
    pub random: RandomRanges,
    pub random_trials: usize,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            candidates: Candidate::default_set(),
            random: RandomRanges::default(),
            random_trials: 20,
        }
    }
}

/// One configuration scheduled for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub name: String,
    pub params: TuningParams,
    pub seed_offset: u32,
}

impl SearchSpace {
    pub fn candidate_base(&self) -> u32 {
        GROUP_OFFSET_SPACING.max(self.grid.size() as u32)
    }

    pub fn random_base(&self) -> u32 {
        self.candidate_base() + GROUP_OFFSET_SPACING.max(self.candidates.len() as u32)
    }

    /// Trials of one group with their seed offsets.
    pub fn trials(&self, group: SearchGroup, seed: u32) -> Vec<Trial> {
        match group {
            SearchGroup::Grid => self
                .grid
                .expand()
                .into_iter()
                .enumerate()
                .map(|(i, params)| Trial {
                    name: String::new(),
                    params,
                    seed_offset: i as u32,
                })
                .collect(),
            SearchGroup::Candidates => {
                let base = self.candidate_base();
                self.candidates
                    .iter()
                    .enumerate()
                    .map(|(i, c)| Trial {
                        name: c.name.clone(),
                        params: c.params(),
                        seed_offset: base + i as u32,
                    })
                    .collect()
            }
            SearchGroup::Random => {
                let base = self.random_base();
                self.random
                    .sample(self.random_trials, seed)
                    .into_iter()
                    .enumerate()
                    .map(|(i, params)| Trial {
                        name: String::new(),
                        params,
                        seed_offset: base + i as u32,
                    })
                    .collect()
            }
        }
    }
}

/// Runs a [`SearchSpace`] over a draw sequence.
#[derive(Debug, Clone)]
pub struct TuningHarness {
    space: SearchSpace,
    options: RunOptions,
    seed: u32,
    feature_weights: FeatureWeights,
}

impl TuningHarness {
    /// Validates the options, the random ranges and every grid and candidate
    /// configuration up front. A configuration repeated within a group is
    /// rejected: the copies would share an identity but not a seed offset,
    /// and their chunks could not be merged.
    pub fn new(
        space: SearchSpace,
        options: RunOptions,
        seed: u32,
        feature_weights: FeatureWeights,
    ) -> Result<Self, TuneError> {
        options.validate().map_err(TuneError::Options)?;
        space.random.validate()?;
        let harness = Self {
            space,
            options,
            seed,
            feature_weights,
        };
        for group in SearchGroup::ALL {
            let trials = harness.space.trials(group, seed);
            let mut seen = BTreeMap::new();
            for (index, trial) in trials.iter().enumerate() {
                if group != SearchGroup::Random {
                    harness.weighting(group, index, trial)?;
                }
                let identity = config_identity(&trial.name, &trial.params);
                if let Some(&first) = seen.get(&identity) {
                    return Err(TuneError::DuplicateConfig { group, index, first });
                }
                seen.insert(identity, index);
            }
        }
        Ok(harness)
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Evaluate all three groups and assemble the report.
    pub fn run(&self, draws: &[Draw]) -> Result<TuningReport, TuneError> {
        let (start_idx, end_idx) = self.options.bounds(draws.len());
        let evaluated_draws = self.options.targets(draws.len()).count() as u64;
        info!(
            draws = draws.len(),
            start_idx,
            end_idx,
            evaluated_draws,
            grid = self.space.grid.size(),
            candidates = self.space.candidates.len(),
            random = self.space.random_trials,
            "starting tuning"
        );

        let grid = self.run_group(SearchGroup::Grid, draws)?;
        let candidates = self.run_group(SearchGroup::Candidates, draws)?;
        let random = self.run_group(SearchGroup::Random, draws)?;

        let summary = TuningSummary {
            draws: draws.len(),
            dataset_hash: dataset_hash(draws),
            min_history: self.options.min_history,
            tickets_per_draw: self.options.tickets_per_draw,
            stride: self.options.stride,
            random_trials: self.space.random_trials,
            start_idx,
            end_idx,
            seed: self.seed,
            evaluated_draws,
            chunks: 1,
            inputs: Vec::new(),
        };

        Ok(TuningReport {
            schema_version: SCHEMA_VERSION,
            summary,
            grid,
            candidates,
            random,
        })
    }

    /// Evaluate one group in parallel and sort it.
    pub fn run_group(&self, group: SearchGroup, draws: &[Draw]) -> Result<Vec<TuningResult>, TuneError> {
        let trials = self.space.trials(group, self.seed);
        info!(%group, configs = trials.len(), "evaluating group");

        let mut results = trials
            .par_iter()
            .enumerate()
            .map(|(index, trial)| self.evaluate(group, index, trial, draws))
            .collect::<Result<Vec<_>, _>>()?;
        sort_results(&mut results);

        if let Some(best) = results.first() {
            info!(
                %group,
                avg_best_hits = best.rates.avg_best_hits,
                avg_avg_hits = best.rates.avg_avg_hits,
                "group finished"
            );
        }
        Ok(results)
    }

    fn weighting(&self, group: SearchGroup, index: usize, trial: &Trial) -> Result<WeightingParams, TuneError> {
        let params = trial.params.weighting(&self.feature_weights);
        params
            .validate()
            .map_err(|source| TuneError::InvalidConfig { group, index, source })?;
        Ok(params)
    }

    fn evaluate(
        &self,
        group: SearchGroup,
        index: usize,
        trial: &Trial,
        draws: &[Draw],
    ) -> Result<TuningResult, TuneError> {
        let params = self.weighting(group, index, trial)?;
        let runner = BacktestRunner::new(params, self.options.clone())?;
        let counters = runner.accumulate(draws, offset_seed(self.seed, trial.seed_offset))?;
        debug!(
            %group,
            index,
            name = %trial.name,
            seed_offset = trial.seed_offset,
            count = counters.count,
            "configuration evaluated"
        );
        Ok(TuningResult::new(
            trial.name.clone(),
            trial.params,
            trial.seed_offset,
            counters,
        ))
    }
}
