//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: backtest, tuning and forecast reports with schema versioning
//! - **CSV**: flat tuning table and forecast tickets for spreadsheets
//! - **Markdown**: top-N tuning report per search group
//!
//! All persisted artifacts include a `schema_version` field. Tuning reports
//! are read back through [`crate::merge::read_tuning_report`], which rejects
//! newer versions.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use drawlab_core::engine::Forecast;

use crate::result::{SearchGroup, TuningReport, TuningResult};

// ─── JSON export ────────────────────────────────────────────────────

/// Pretty JSON for any report.
pub fn export_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

pub const TUNING_CSV_HEADER: [&str; 12] = [
    "group",
    "name",
    "windowSize",
    "halfLife",
    "explore",
    "hotBoost",
    "coldBoost",
    "coldWindow",
    "avgBestHits",
    "avgAvgHits",
    "pctAtLeast2",
    "pctAtLeast3",
];

/// One row per result, groups in report order. Rates have 4 decimals.
pub fn export_tuning_csv(report: &TuningReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(TUNING_CSV_HEADER)?;

    for group in SearchGroup::ALL {
        for r in report.group(group) {
            let p = &r.params;
            wtr.write_record([
                group.label().to_string(),
                r.name.clone(),
                p.window_size.to_string(),
                p.half_life.to_string(),
                p.explore.to_string(),
                p.hot_boost.to_string(),
                p.cold_boost.to_string(),
                p.cold_window.to_string(),
                format!("{:.4}", r.rates.avg_best_hits),
                format!("{:.4}", r.rates.avg_avg_hits),
                format!("{:.4}", r.rates.pct_at_least_2),
                format!("{:.4}", r.rates.pct_at_least_3),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: ticket (1-based), n1..n6, entropy.
pub fn export_forecast_csv(forecast: &Forecast) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticket", "n1", "n2", "n3", "n4", "n5", "n6", "entropy"])?;

    for (i, scored) in forecast.tickets.iter().enumerate() {
        let mut row = vec![(i + 1).to_string()];
        row.extend(scored.ticket.numbers().iter().map(u8::to_string));
        // Short tickets only happen with an exhausted pool; keep the columns aligned.
        row.resize(7, String::new());
        row.push(scored.entropy.to_string());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write `content` to `path`, creating parent directories.
pub fn write_artifact(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    write_artifact(path, &export_json(report)?)
}

// ─── Markdown reports ───────────────────────────────────────────────

fn push_result_row(md: &mut String, r: &TuningResult) {
    let p = &r.params;
    md.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} | {} | {:.4} | {:.4} | {:.4} | {:.4} |\n",
        if r.name.is_empty() { "-" } else { r.name.as_str() },
        p.window_size,
        p.half_life,
        p.explore,
        p.hot_boost,
        p.cold_boost,
        p.cold_window,
        r.rates.avg_best_hits,
        r.rates.avg_avg_hits,
        r.rates.pct_at_least_2,
        r.rates.pct_at_least_3,
    ));
}

/// Markdown report with the top `top` results of each search group.
pub fn generate_tuning_report(report: &TuningReport, top: usize) -> String {
    let s = &report.summary;
    let mut md = String::with_capacity(4096);

    md.push_str("# Tuning Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Draws | {} |\n", s.draws));
    md.push_str(&format!("| Dataset Hash | {} |\n", s.dataset_hash));
    md.push_str(&format!("| Target Range | {}..{} |\n", s.start_idx, s.end_idx));
    md.push_str(&format!("| Evaluated Draws | {} |\n", s.evaluated_draws));
    md.push_str(&format!("| Tickets per Draw | {} |\n", s.tickets_per_draw));
    md.push_str(&format!("| Min History | {} |\n", s.min_history));
    md.push_str(&format!("| Stride | {} |\n", s.stride));
    md.push_str(&format!("| Seed | {} |\n", s.seed));
    md.push_str(&format!("| Random Trials | {} |\n", s.random_trials));
    if s.chunks > 1 {
        md.push_str(&format!("| Chunks | {} |\n", s.chunks));
    }
    md.push('\n');

    if let Some((group, best)) = report.best() {
        md.push_str("## Best Configuration\n\n");
        md.push_str(&format!(
            "{} from {}: avg best hits {:.4}, avg hits {:.4}, at least 2 hits in {:.1}% of draws.\n\n",
            if best.name.is_empty() { "unnamed" } else { best.name.as_str() },
            group.title(),
            best.rates.avg_best_hits,
            best.rates.avg_avg_hits,
            best.rates.pct_at_least_2 * 100.0,
        ));
    }

    for group in SearchGroup::ALL {
        let list = report.group(group);
        md.push_str(&format!("## {}\n\n", group.title()));
        if list.is_empty() {
            md.push_str("_No results._\n\n");
            continue;
        }
        md.push_str("| Name | Window | HalfLife | Explore | Hot | Cold | ColdWindow | AvgBest | AvgAvg | Pct>=2 | Pct>=3 |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n");
        for r in list.iter().take(top) {
            push_result_row(&mut md, r);
        }
        md.push('\n');
    }

    md
}
