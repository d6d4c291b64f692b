//! Tuning results and reports.
//!
//! A [`TuningResult`] carries the raw counters of one configuration next to
//! the rates derived from them. Counters are the source of truth: merging adds
//! counters and rebuilds the rates, never the other way round.

use serde::{Deserialize, Serialize};
use std::fmt;

use drawlab_core::domain::{DatasetHash, FullHash};
use drawlab_core::engine::{HitAccumulator, HitRates};

use crate::runner::SCHEMA_VERSION;
use crate::tuning::TuningParams;

/// The three search modes, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchGroup {
    Grid,
    Candidates,
    Random,
}

impl SearchGroup {
    pub const ALL: [SearchGroup; 3] = [Self::Grid, Self::Candidates, Self::Random];

    pub fn label(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Candidates => "candidates",
            Self::Random => "random",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Grid => "Grid Search",
            Self::Candidates => "Candidate Runs",
            Self::Random => "Random Search",
        }
    }
}

impl fmt::Display for SearchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningResult {
    /// Candidate name; empty for grid and random configurations.
    #[serde(default)]
    pub name: String,
    pub params: TuningParams,
    #[serde(default)]
    pub seed_offset: u32,
    #[serde(flatten)]
    pub rates: HitRates,
    #[serde(flatten)]
    pub counters: HitAccumulator,
}

impl TuningResult {
    pub fn new(name: String, params: TuningParams, seed_offset: u32, counters: HitAccumulator) -> Self {
        Self {
            name,
            params,
            seed_offset,
            rates: counters.rates(),
            counters,
        }
    }

    /// Merge key: name plus the six parameter values. The seed offset is not
    /// part of it.
    pub fn identity(&self) -> FullHash {
        config_identity(&self.name, &self.params)
    }

    /// Add another partition's counters and rebuild the rates.
    pub fn absorb(&mut self, other: &TuningResult) {
        self.counters.merge(&other.counters);
        self.rates = self.counters.rates();
    }
}

/// Identity of a named configuration, shared by the harness and the merger.
pub fn config_identity(name: &str, params: &TuningParams) -> FullHash {
    let json = serde_json::to_string(&(name, params)).expect("tuning identity must serialize");
    FullHash::from_bytes(json.as_bytes())
}

/// Descending by average best hits, then by average mean hits. The sort is
/// stable, so fully tied results keep their input order.
pub fn sort_results(results: &mut [TuningResult]) {
    results.sort_by(|a, b| {
        b.rates
            .avg_best_hits
            .total_cmp(&a.rates.avg_best_hits)
            .then(b.rates.avg_avg_hits.total_cmp(&a.rates.avg_avg_hits))
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningSummary {
    /// Number of draws in the input sequence.
    pub draws: usize,
    pub dataset_hash: DatasetHash,
    pub min_history: usize,
    pub tickets_per_draw: usize,
    pub stride: usize,
    pub random_trials: usize,
    pub start_idx: usize,
    pub end_idx: usize,
    pub seed: u32,
    /// Target draws evaluated per configuration, summed over merged chunks.
    #[serde(default)]
    pub evaluated_draws: u64,
    #[serde(default = "default_chunks")]
    pub chunks: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

fn default_chunks() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub summary: TuningSummary,
    pub grid: Vec<TuningResult>,
    pub candidates: Vec<TuningResult>,
    pub random: Vec<TuningResult>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl TuningReport {
    pub fn group(&self, group: SearchGroup) -> &[TuningResult] {
        match group {
            SearchGroup::Grid => &self.grid,
            SearchGroup::Candidates => &self.candidates,
            SearchGroup::Random => &self.random,
        }
    }

    /// Best configuration across all groups, if any was evaluated.
    pub fn best(&self) -> Option<(SearchGroup, &TuningResult)> {
        SearchGroup::ALL
            .iter()
            .flat_map(|&g| self.group(g).iter().map(move |r| (g, r)))
            .filter(|(_, r)| !r.counters.is_empty())
            .max_by(|(_, a), (_, b)| {
                a.rates
                    .avg_best_hits
                    .total_cmp(&b.rates.avg_best_hits)
                    .then(a.rates.avg_avg_hits.total_cmp(&b.rates.avg_avg_hits))
            })
    }

    pub fn len(&self) -> usize {
        self.grid.len() + self.candidates.len() + self.random.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
