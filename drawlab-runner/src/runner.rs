//! Run orchestration: wires loaded draws and configuration into the engine.
//!
//! Three entry points, one per artifact:
//! - `run_backtest()`: single configuration, per-draw records.
//! - `run_tuning()`: grid, candidates and random search over one chunk.
//! - `run_forecast()`: tickets for the draw after the loaded history.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use drawlab_core::domain::{DatasetHash, DrawFeatures};
use drawlab_core::engine::{
    forecast, BacktestRunner, DrawRecord, EngineError, Forecast, RunSummary, WeightingParams,
};

use crate::config::{ConfigError, ForecastConfig, PredictorConfig, TuningConfig};
use crate::data_loader::{LoadError, LoadedDraws};
use crate::result::TuningReport;
use crate::tuning::{TuneError, TuningHarness};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("tuning error: {0}")]
    Tune(#[from] TuneError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Persisted single backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub dataset_hash: DatasetHash,
    pub summary: RunSummary,
    pub results: Vec<DrawRecord>,
}

/// Persisted forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub dataset_hash: DatasetHash,
    /// Draws in the history the forecast was built from.
    pub history_draws: usize,
    pub last_draw_id: Option<u32>,
    pub target: DrawFeatures,
    pub params: WeightingParams,
    pub min_history: usize,
    pub seed: u32,
    #[serde(flatten)]
    pub forecast: Forecast,
}

/// Backtest one configuration over the loaded draws.
pub fn run_backtest(loaded: &LoadedDraws, config: &PredictorConfig) -> Result<BacktestReport, RunError> {
    let runner = BacktestRunner::new(config.weighting_params(), config.run_options())?;
    let run = runner.run(&loaded.draws, config.seed)?;
    info!(
        evaluated = run.summary.total_draws,
        avg_best_hits = run.summary.avg_best_hits,
        avg_avg_hits = run.summary.avg_avg_hits,
        "backtest finished"
    );
    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        dataset_hash: loaded.dataset_hash.clone(),
        summary: run.summary,
        results: run.results,
    })
}

/// Run the full search for the chunk described by `config`.
pub fn run_tuning(loaded: &LoadedDraws, config: &TuningConfig) -> Result<TuningReport, RunError> {
    let harness = TuningHarness::new(
        config.search_space(),
        config.run_options(),
        config.seed,
        config.feature_weights,
    )?;
    Ok(harness.run(&loaded.draws)?)
}

/// Forecast tickets for the next draw. `target` defaults to an empty feature
/// bag, which leaves the astro component at zero.
pub fn run_forecast(
    loaded: &LoadedDraws,
    target: Option<DrawFeatures>,
    predictor: &PredictorConfig,
    forecast_config: &ForecastConfig,
) -> Result<ForecastReport, RunError> {
    let params = predictor.weighting_params();
    let options = predictor.forecast_options(forecast_config);
    let target = target.unwrap_or_default();

    let result = forecast(&loaded.draws, Some(&target), &params, &options, predictor.seed)?;
    info!(
        tickets = result.tickets.len(),
        freq = result.coefficients.freq,
        recency = result.coefficients.recency,
        astro = result.coefficients.astro,
        "forecast finished"
    );

    Ok(ForecastReport {
        schema_version: SCHEMA_VERSION,
        dataset_hash: loaded.dataset_hash.clone(),
        history_draws: loaded.draws.len(),
        last_draw_id: loaded.draws.last().map(|d| d.id),
        target,
        params,
        min_history: options.min_history,
        seed: predictor.seed,
        forecast: result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drawlab_core::domain::{Draw, LunarPhase};
    use drawlab_core::fingerprint::dataset_hash;
    use std::path::PathBuf;

    fn loaded(n: u32) -> LoadedDraws {
        let start = NaiveDate::from_ymd_opt(2012, 5, 5).unwrap();
        let draws: Vec<Draw> = (1..=n)
            .map(|id| {
                let a = ((id * 7) % 50) as i64 + 1;
                let features = DrawFeatures {
                    lunar_phase: Some(LunarPhase::ALL[(id % 8) as usize]),
                    ..Default::default()
                };
                Draw::new(
                    id,
                    start + chrono::Duration::days(i64::from(id) * 3),
                    &[a, a + 2, a + 4, a + 6, a + 8, a + 10],
                    Some(features),
                )
                .unwrap()
            })
            .collect();
        LoadedDraws {
            dataset_hash: dataset_hash(&draws),
            draws,
            source: PathBuf::from("memory"),
        }
    }

    #[test]
    fn backtest_report_carries_dataset_and_records() {
        let data = loaded(80);
        let config = PredictorConfig {
            window_size: 40,
            min_history: 30,
            tickets_per_draw: 4,
            ..Default::default()
        };
        let report = run_backtest(&data, &config).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.dataset_hash, data.dataset_hash);
        assert_eq!(report.results.len(), 50);
        assert_eq!(report.summary.total_draws, 50);
        assert_eq!(report.summary.seed, 42);
    }

    #[test]
    fn invalid_predictor_settings_fail() {
        let config = PredictorConfig {
            half_life: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            run_backtest(&loaded(60), &config),
            Err(RunError::Engine(EngineError::Params(_)))
        ));
    }

    #[test]
    fn forecast_report_describes_history() {
        let data = loaded(70);
        let target = DrawFeatures {
            lunar_phase: Some(LunarPhase::FullMoon),
            ..Default::default()
        };
        let report = run_forecast(
            &data,
            Some(target.clone()),
            &PredictorConfig::default(),
            &ForecastConfig { tickets: 5 },
        )
        .unwrap();
        assert_eq!(report.history_draws, 70);
        assert_eq!(report.last_draw_id, Some(70));
        assert_eq!(report.target, target);
        assert_eq!(report.forecast.tickets.len(), 5);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("coefficients").is_some());
        assert!(json.get("tickets").is_some());
    }

    #[test]
    fn tuning_uses_configured_chunk() {
        let data = loaded(90);
        let config = TuningConfig {
            min_history: 40,
            tickets_per_draw: 2,
            start_idx: Some(60),
            random_trials: 2,
            grid: crate::tuning::GridSpec {
                window_sizes: vec![30],
                half_lives: vec![10.0],
                explore: vec![0.1],
                hot_boost: vec![0.05],
                cold_boost: vec![0.1],
                cold_windows: vec![10],
            },
            ..Default::default()
        };
        let report = run_tuning(&data, &config).unwrap();
        assert_eq!(report.summary.start_idx, 60);
        assert_eq!(report.summary.end_idx, 90);
        assert_eq!(report.summary.evaluated_draws, 30);
        assert_eq!(report.grid.len(), 1);
        assert_eq!(report.candidates.len(), 5);
        assert_eq!(report.random.len(), 2);
        assert_eq!(report.summary.dataset_hash, data.dataset_hash);
    }
}
