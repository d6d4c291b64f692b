//! Merging partitioned tuning runs.
//!
//! A long tuning run can be split by `start_idx` / `end_idx` into chunks that
//! run on different machines. Each chunk writes a `tuning_chunk_*.json`
//! report; the merger sums the counters of results with the same identity
//! (name plus the six parameter values) and rebuilds the rates from the sums.
//!
//! Results are keyed by identity in an ordered map, so merging is commutative
//! and associative: any chunk order yields the same report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use drawlab_core::domain::{DatasetHash, FullHash};

use crate::result::{sort_results, SearchGroup, TuningReport, TuningResult, TuningSummary};
use crate::runner::SCHEMA_VERSION;

/// File name prefix of chunk reports picked up by [`merge_dir`].
pub const CHUNK_PREFIX: &str = "tuning_chunk_";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no tuning_chunk_*.json files in {}", .0.display())]
    NoChunks(PathBuf),
    #[error("nothing to merge")]
    Empty,
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("{group} result '{name}' has inconsistent counters")]
    InconsistentCounters { group: SearchGroup, name: String },
    #[error("{group} result '{name}' appears with seed offsets {first} and {second}")]
    SeedOffsetMismatch {
        group: SearchGroup,
        name: String,
        first: u32,
        second: u32,
    },
    #[error("dataset mismatch: expected {expected}, found {found}")]
    DatasetMismatch {
        expected: DatasetHash,
        found: DatasetHash,
    },
    #[error("chunks disagree on {0}")]
    SettingsMismatch(&'static str),
}

/// Display name of a result in error messages.
fn label(result: &TuningResult) -> String {
    if result.name.is_empty() {
        format!(
            "window={} halfLife={} explore={} hot={} cold={} coldWindow={}",
            result.params.window_size,
            result.params.half_life,
            result.params.explore,
            result.params.hot_boost,
            result.params.cold_boost,
            result.params.cold_window,
        )
    } else {
        result.name.clone()
    }
}

/// Incremental merger. Add reports in any order, then [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct ResultMerger {
    groups: BTreeMap<SearchGroup, BTreeMap<FullHash, TuningResult>>,
    summary: Option<TuningSummary>,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports added so far.
    pub fn chunks(&self) -> usize {
        self.summary.as_ref().map_or(0, |s| s.chunks)
    }

    /// Fold one report in. `input` names its source in the merged summary.
    pub fn add_report(&mut self, report: &TuningReport, input: Option<&str>) -> Result<(), MergeError> {
        check_schema(report)?;
        for group in SearchGroup::ALL {
            if let Some(r) = report.group(group).iter().find(|r| !r.counters.is_consistent()) {
                return Err(MergeError::InconsistentCounters {
                    group,
                    name: label(r),
                });
            }
        }

        let mut incoming = report.summary.clone();
        if let Some(name) = input {
            incoming.inputs.push(name.to_string());
        }
        self.summary = Some(match self.summary.take() {
            None => incoming,
            Some(current) => combine_summaries(current, incoming)?,
        });

        for group in SearchGroup::ALL {
            let merged = self.groups.entry(group).or_default();
            for result in report.group(group) {
                match merged.get_mut(&result.identity()) {
                    Some(existing) => {
                        if existing.seed_offset != result.seed_offset {
                            return Err(MergeError::SeedOffsetMismatch {
                                group,
                                name: label(result),
                                first: existing.seed_offset,
                                second: result.seed_offset,
                            });
                        }
                        existing.absorb(result);
                    }
                    None => {
                        let fresh = TuningResult::new(
                            result.name.clone(),
                            result.params,
                            result.seed_offset,
                            result.counters,
                        );
                        merged.insert(result.identity(), fresh);
                    }
                }
            }
        }
        Ok(())
    }

    /// Sorted merged report.
    pub fn finish(self) -> Result<TuningReport, MergeError> {
        let summary = self.summary.ok_or(MergeError::Empty)?;
        let mut groups = self.groups;
        let mut take = |group: SearchGroup| {
            let mut list: Vec<TuningResult> = groups
                .remove(&group)
                .map(|m| m.into_values().collect())
                .unwrap_or_default();
            sort_results(&mut list);
            list
        };
        let grid = take(SearchGroup::Grid);
        let candidates = take(SearchGroup::Candidates);
        let random = take(SearchGroup::Random);
        Ok(TuningReport {
            schema_version: SCHEMA_VERSION,
            summary,
            grid,
            candidates,
            random,
        })
    }
}

/// Chunks of one run share the dataset and every setting except the index
/// range. Counts add up; the range widens to cover both.
fn combine_summaries(a: TuningSummary, b: TuningSummary) -> Result<TuningSummary, MergeError> {
    if a.dataset_hash != b.dataset_hash {
        return Err(MergeError::DatasetMismatch {
            expected: a.dataset_hash,
            found: b.dataset_hash,
        });
    }
    let checks = [
        ("draws", a.draws == b.draws),
        ("min_history", a.min_history == b.min_history),
        ("tickets_per_draw", a.tickets_per_draw == b.tickets_per_draw),
        ("stride", a.stride == b.stride),
        ("random_trials", a.random_trials == b.random_trials),
        ("seed", a.seed == b.seed),
    ];
    if let Some(&(field, _)) = checks.iter().find(|(_, same)| !same) {
        return Err(MergeError::SettingsMismatch(field));
    }

    let mut inputs = a.inputs;
    inputs.extend(b.inputs);
    inputs.sort();

    Ok(TuningSummary {
        start_idx: a.start_idx.min(b.start_idx),
        end_idx: a.end_idx.max(b.end_idx),
        evaluated_draws: a.evaluated_draws + b.evaluated_draws,
        chunks: a.chunks + b.chunks,
        inputs,
        ..a
    })
}

/// Merge in-memory reports.
pub fn merge_reports(reports: &[TuningReport]) -> Result<TuningReport, MergeError> {
    let mut merger = ResultMerger::new();
    for report in reports {
        merger.add_report(report, None)?;
    }
    merger.finish()
}

fn check_schema(report: &TuningReport) -> Result<(), MergeError> {
    if report.schema_version > SCHEMA_VERSION {
        return Err(MergeError::UnsupportedSchema {
            found: report.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Read a tuning report (a chunk or a merged result), rejecting newer
/// schema versions.
pub fn read_tuning_report(path: &Path) -> Result<TuningReport, MergeError> {
    let raw = std::fs::read_to_string(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report: TuningReport =
        serde_json::from_str(raw.trim_start_matches('\u{feff}')).map_err(|source| MergeError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    check_schema(&report)?;
    Ok(report)
}

/// Chunk files in `dir`, sorted by file name.
pub fn chunk_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MergeError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MergeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(CHUNK_PREFIX) && name.ends_with(".json") {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Merge every chunk report in `dir`.
pub fn merge_dir(dir: &Path) -> Result<TuningReport, MergeError> {
    let files = chunk_files(dir)?;
    if files.is_empty() {
        return Err(MergeError::NoChunks(dir.to_path_buf()));
    }

    let mut merger = ResultMerger::new();
    for path in &files {
        let report = read_tuning_report(path)?;
        let input = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        merger.add_report(&report, input.as_deref())?;
        info!(
            file = %path.display(),
            results = report.len(),
            evaluated_draws = report.summary.evaluated_draws,
            "chunk merged"
        );
    }

    let merged = merger.finish()?;
    info!(
        chunks = merged.summary.chunks,
        results = merged.len(),
        "merge complete"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::TuningParams;
    use drawlab_core::engine::HitAccumulator;

    fn params(window_size: usize) -> TuningParams {
        TuningParams {
            window_size,
            half_life: 20.0,
            explore: 0.1,
            hot_boost: 0.05,
            cold_boost: 0.1,
            cold_window: 25,
        }
    }

    fn counters(best_sum: u64, count: u64) -> HitAccumulator {
        HitAccumulator {
            best_sum,
            hit_sum: best_sum,
            tickets: 2 * count,
            count,
            at_least_2: 0,
            at_least_3: 0,
        }
    }

    fn summary(start_idx: usize, end_idx: usize) -> TuningSummary {
        TuningSummary {
            draws: 200,
            dataset_hash: DatasetHash::from_hash("abc"),
            min_history: 50,
            tickets_per_draw: 10,
            stride: 1,
            random_trials: 0,
            start_idx,
            end_idx,
            seed: 12345,
            evaluated_draws: (end_idx - start_idx) as u64,
            chunks: 1,
            inputs: Vec::new(),
        }
    }

    fn report(start_idx: usize, end_idx: usize, grid: Vec<TuningResult>) -> TuningReport {
        TuningReport {
            schema_version: SCHEMA_VERSION,
            summary: summary(start_idx, end_idx),
            grid,
            candidates: Vec::new(),
            random: Vec::new(),
        }
    }

    fn grid_result(window: usize, offset: u32, best_sum: u64, count: u64) -> TuningResult {
        TuningResult::new(String::new(), params(window), offset, counters(best_sum, count))
    }

    #[test]
    fn rates_come_from_summed_counters() {
        let a = report(50, 54, vec![grid_result(80, 0, 12, 4)]);
        let b = report(54, 66, vec![grid_result(80, 0, 4, 12)]);
        let merged = merge_reports(&[a, b]).unwrap();

        assert_eq!(merged.grid.len(), 1);
        let r = &merged.grid[0];
        assert_eq!(r.counters.count, 16);
        assert_eq!(r.rates.avg_best_hits, 1.0);
        assert_eq!(merged.summary.chunks, 2);
        assert_eq!(merged.summary.start_idx, 50);
        assert_eq!(merged.summary.end_idx, 66);
        assert_eq!(merged.summary.evaluated_draws, 16);
    }

    #[test]
    fn tenth_valued_averages_merge_in_any_grouping() {
        // One draw per chunk with ten tickets: per-draw averages 0.1, 0.2, 0.3.
        let chunk = |start: usize, hits: usize| {
            let mut counters = HitAccumulator::default();
            let mut tickets = vec![0; 10];
            tickets[..hits].fill(1);
            counters.record(&tickets);
            let result = TuningResult::new(String::new(), params(80), 0, counters);
            let mut r = report(start, start + 1, vec![result]);
            r.summary.evaluated_draws = 1;
            r
        };
        let (a, b, c) = (chunk(50, 1), chunk(51, 2), chunk(52, 3));

        let left = merge_reports(&[merge_reports(&[a.clone(), b.clone()]).unwrap(), c.clone()]).unwrap();
        let right = merge_reports(&[a.clone(), merge_reports(&[b.clone(), c.clone()]).unwrap()]).unwrap();
        let flat = merge_reports(&[c, a, b]).unwrap();

        assert_eq!(left, right);
        assert_eq!(left, flat);
        assert_eq!(left.grid[0].counters.hit_sum, 6);
        assert_eq!(left.grid[0].rates.avg_avg_hits, 6.0 / 30.0);
    }

    #[test]
    fn distinct_identities_stay_separate_and_sorted() {
        let a = report(50, 60, vec![grid_result(80, 0, 10, 10), grid_result(120, 1, 30, 10)]);
        let b = report(60, 70, vec![grid_result(120, 1, 30, 10), grid_result(80, 0, 10, 10)]);
        let merged = merge_reports(&[a, b]).unwrap();
        let windows: Vec<usize> = merged.grid.iter().map(|r| r.params.window_size).collect();
        assert_eq!(windows, vec![120, 80]);
    }

    #[test]
    fn order_of_reports_does_not_matter() {
        let a = report(50, 60, vec![grid_result(80, 0, 10, 10), grid_result(120, 1, 10, 10)]);
        let b = report(60, 70, vec![grid_result(120, 1, 7, 10)]);
        assert_eq!(
            merge_reports(&[a.clone(), b.clone()]).unwrap(),
            merge_reports(&[b, a]).unwrap()
        );
    }

    #[test]
    fn inconsistent_counters_are_rejected() {
        let mut bad = grid_result(80, 0, 10, 4);
        bad.counters.at_least_3 = 3;
        bad.counters.at_least_2 = 1;
        let err = merge_reports(&[report(50, 54, vec![bad])]).unwrap_err();
        assert!(matches!(err, MergeError::InconsistentCounters { group: SearchGroup::Grid, .. }));
    }

    #[test]
    fn mismatched_seed_offsets_are_rejected() {
        let a = report(50, 60, vec![grid_result(80, 0, 10, 10)]);
        let b = report(60, 70, vec![grid_result(80, 5, 10, 10)]);
        assert!(matches!(
            merge_reports(&[a, b]),
            Err(MergeError::SeedOffsetMismatch { first: 0, second: 5, .. })
        ));
    }

    #[test]
    fn different_datasets_are_rejected() {
        let a = report(50, 60, vec![]);
        let mut b = report(60, 70, vec![]);
        b.summary.dataset_hash = DatasetHash::from_hash("def");
        assert!(matches!(merge_reports(&[a, b]), Err(MergeError::DatasetMismatch { .. })));
    }

    #[test]
    fn different_settings_are_rejected() {
        let a = report(50, 60, vec![]);
        let mut b = report(60, 70, vec![]);
        b.summary.tickets_per_draw = 5;
        assert!(matches!(
            merge_reports(&[a, b]),
            Err(MergeError::SettingsMismatch("tickets_per_draw"))
        ));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut a = report(50, 60, vec![]);
        a.schema_version = SCHEMA_VERSION + 1;
        assert!(matches!(merge_reports(&[a]), Err(MergeError::UnsupportedSchema { .. })));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(merge_reports(&[]), Err(MergeError::Empty)));
    }

    #[test]
    fn reads_report_files_with_schema_guard() {
        let dir = tempfile::tempdir().unwrap();
        let original = report(50, 60, vec![grid_result(80, 0, 10, 10)]);

        let path = dir.path().join("tuning_results.json");
        let json = serde_json::to_string(&original).unwrap();
        std::fs::write(&path, format!("\u{feff}{json}")).unwrap();
        assert_eq!(read_tuning_report(&path).unwrap(), original);

        let mut newer = original;
        newer.schema_version = SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&newer).unwrap()).unwrap();
        assert!(matches!(
            read_tuning_report(&path),
            Err(MergeError::UnsupportedSchema { found, .. }) if found == SCHEMA_VERSION + 1
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(read_tuning_report(&missing), Err(MergeError::Io { .. })));
    }
}
