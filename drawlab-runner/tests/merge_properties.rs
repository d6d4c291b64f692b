//! Property tests for the result merger.
//!
//! Uses proptest to verify:
//! 1. Commutativity: report order does not change the merge
//! 2. Associativity: merging merged reports equals merging all at once
//! 3. Counters: merged counts are the sum of the inputs per identity

use drawlab_core::domain::DatasetHash;
use drawlab_core::engine::HitAccumulator;
use drawlab_runner::{
    merge_reports, SearchGroup, TuningParams, TuningReport, TuningResult, TuningSummary,
    SCHEMA_VERSION,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// A handful of fixed configurations so reports overlap in identity.
fn params(slot: usize) -> TuningParams {
    TuningParams {
        window_size: 80 + 40 * (slot % 3),
        half_life: 10.0 * (1 + slot / 3) as f64,
        explore: 0.1,
        hot_boost: 0.05,
        cold_boost: 0.1,
        cold_window: 15,
    }
}

/// Counters recorded from draws of ten tickets, the default ticket count.
fn arb_counters() -> impl Strategy<Value = HitAccumulator> {
    prop::collection::vec(prop::collection::vec(0usize..=6, 10), 1..20).prop_map(|draws| {
        let mut acc = HitAccumulator::default();
        for hits in draws {
            acc.record(&hits);
        }
        acc
    })
}

/// Results for a subset of the six configuration slots, one per slot.
fn arb_group() -> impl Strategy<Value = Vec<TuningResult>> {
    prop::collection::btree_map(0usize..6, arb_counters(), 0..6).prop_map(|slots| {
        slots
            .into_iter()
            .map(|(slot, counters)| {
                TuningResult::new(String::new(), params(slot), slot as u32, counters)
            })
            .collect()
    })
}

fn arb_report() -> impl Strategy<Value = TuningReport> {
    (arb_group(), arb_group(), 0usize..500).prop_map(|(grid, random, start)| TuningReport {
        schema_version: SCHEMA_VERSION,
        summary: TuningSummary {
            draws: 2000,
            dataset_hash: DatasetHash::from_hash("same-data"),
            min_history: 50,
            tickets_per_draw: 10,
            stride: 1,
            random_trials: 20,
            start_idx: start,
            end_idx: start + 10,
            seed: 12345,
            evaluated_draws: 10,
            chunks: 1,
            inputs: Vec::new(),
        },
        grid,
        candidates: Vec::new(),
        random,
    })
}

// ── 1. Commutativity ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_commutative(a in arb_report(), b in arb_report()) {
        let ab = merge_reports(&[a.clone(), b.clone()]).unwrap();
        let ba = merge_reports(&[b, a]).unwrap();
        prop_assert_eq!(ab, ba);
    }
}

// ── 2. Associativity ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_associative(a in arb_report(), b in arb_report(), c in arb_report()) {
        let left = merge_reports(&[merge_reports(&[a.clone(), b.clone()]).unwrap(), c.clone()]).unwrap();
        let right = merge_reports(&[a.clone(), merge_reports(&[b.clone(), c.clone()]).unwrap()]).unwrap();
        let flat = merge_reports(&[a, b, c]).unwrap();
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(&left, &flat);
    }
}

// ── 3. Counter sums ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn merged_counts_are_sums(reports in prop::collection::vec(arb_report(), 1..5)) {
        let merged = merge_reports(&reports).unwrap();

        for group in [SearchGroup::Grid, SearchGroup::Random] {
            for r in merged.group(group) {
                let expected: u64 = reports
                    .iter()
                    .flat_map(|rep| rep.group(group))
                    .filter(|x| x.params == r.params)
                    .map(|x| x.counters.count)
                    .sum();
                prop_assert_eq!(r.counters.count, expected);
                prop_assert!(r.counters.is_consistent());
                prop_assert_eq!(r.rates, r.counters.rates());
            }
        }
        prop_assert_eq!(merged.summary.chunks, reports.len());
        prop_assert_eq!(merged.summary.evaluated_draws, 10 * reports.len() as u64);
    }
}
