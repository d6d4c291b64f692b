//! DrawLab Runner: configuration, draw loading, tuning and export.
//!
//! This crate builds on `drawlab-core` to provide:
//! - TOML configuration with defaults for every section
//! - Loading of enriched draw files with dataset fingerprinting
//! - Single backtest and forecast runs
//! - Parameter search (grid, candidates, random) in parallel
//! - Merging of partitioned tuning chunks
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod merge;
pub mod result;
pub mod runner;
pub mod tuning;

pub use config::{ConfigError, DrawLabConfig, ForecastConfig, PredictorConfig, TuningConfig};
pub use data_loader::{load_draws, load_target_features, parse_draws, LoadError, LoadedDraws};
pub use merge::{merge_dir, merge_reports, read_tuning_report, MergeError, ResultMerger};
pub use result::{sort_results, SearchGroup, TuningReport, TuningResult, TuningSummary};
pub use runner::{
    run_backtest, run_forecast, run_tuning, BacktestReport, ForecastReport, RunError,
    SCHEMA_VERSION,
};
pub use tuning::{
    Candidate, GridSpec, RandomRanges, SearchSpace, TuneError, TuningHarness, TuningParams,
};
