//! TOML configuration.
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults of the original tooling. CLI flags are applied on top by the
//! binary, and the result is validated once before any run starts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use drawlab_core::domain::FeatureWeights;
use drawlab_core::engine::{ForecastOptions, ParamError, RunOptions, WeightingParams};

use crate::tuning::{Candidate, GridSpec, RandomRanges, SearchSpace, TuneError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid [{section}] settings: {source}")]
    Invalid {
        section: &'static str,
        #[source]
        source: ParamError,
    },
    #[error("invalid [tuning] search space: {0}")]
    Search(#[from] TuneError),
}

/// Root of `drawlab.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawLabConfig {
    pub predictor: PredictorConfig,
    pub forecast: ForecastConfig,
    pub tuning: TuningConfig,
}

/// Single backtest and forecast settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub window_size: usize,
    pub tickets_per_draw: usize,
    pub half_life: f64,
    pub explore: f64,
    pub min_history: usize,
    pub seed: u32,
    pub cold_window: usize,
    pub hot_boost: f64,
    pub cold_boost: f64,
    pub feature_weights: FeatureWeights,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            window_size: 200,
            tickets_per_draw: 10,
            half_life: 20.0,
            explore: 0.1,
            min_history: 50,
            seed: 42,
            cold_window: 25,
            hot_boost: 0.05,
            cold_boost: 0.1,
            feature_weights: FeatureWeights::default(),
        }
    }
}

impl PredictorConfig {
    pub fn weighting_params(&self) -> WeightingParams {
        WeightingParams {
            window_size: self.window_size,
            half_life: self.half_life,
            explore: self.explore,
            hot_boost: self.hot_boost,
            cold_boost: self.cold_boost,
            cold_window: self.cold_window,
            feature_weights: self.feature_weights,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            tickets_per_draw: self.tickets_per_draw,
            min_history: self.min_history,
            ..RunOptions::default()
        }
    }

    pub fn forecast_options(&self, forecast: &ForecastConfig) -> ForecastOptions {
        ForecastOptions {
            tickets: forecast.tickets,
            min_history: self.min_history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub tickets: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { tickets: 20 }
    }
}

/// Parameter search settings. `start_idx` / `end_idx` stay unset until the
/// draws are loaded, then resolve against the draw count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub tickets_per_draw: usize,
    pub min_history: usize,
    pub stride: usize,
    pub seed: u32,
    pub random_trials: usize,
    pub start_idx: Option<usize>,
    pub end_idx: Option<usize>,
    pub feature_weights: FeatureWeights,
    pub grid: GridSpec,
    pub candidates: Vec<Candidate>,
    pub random: RandomRanges,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            tickets_per_draw: 10,
            min_history: 50,
            stride: 1,
            seed: 12345,
            random_trials: 20,
            start_idx: None,
            end_idx: None,
            feature_weights: FeatureWeights::default(),
            grid: GridSpec::default(),
            candidates: Candidate::default_set(),
            random: RandomRanges::default(),
        }
    }
}

impl TuningConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            tickets_per_draw: self.tickets_per_draw,
            min_history: self.min_history,
            stride: self.stride,
            start_idx: self.start_idx,
            end_idx: self.end_idx,
        }
    }

    pub fn search_space(&self) -> SearchSpace {
        SearchSpace {
            grid: self.grid.clone(),
            candidates: self.candidates.clone(),
            random: self.random.clone(),
            random_trials: self.random_trials,
        }
    }
}

impl DrawLabConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |section| move |source| ConfigError::Invalid { section, source };

        self.predictor
            .weighting_params()
            .validate()
            .map_err(invalid("predictor"))?;
        self.predictor
            .run_options()
            .validate()
            .map_err(invalid("predictor"))?;
        if self.forecast.tickets == 0 {
            return Err(invalid("forecast")(ParamError::Zero("tickets")));
        }

        self.tuning
            .run_options()
            .validate()
            .map_err(invalid("tuning"))?;
        self.tuning.random.validate()?;
        Ok(())
    }
}
