//! Dataset fingerprinting.
//!
//! - `dataset_hash`: content identity of a loaded draw sequence, reported next
//!   to every backtest, tuning and forecast artifact so results from different
//!   inputs are never merged by accident.
//!
//! Tuning configurations are identified by name and params in the runner
//! (`config_identity`), also as a [`FullHash`](crate::domain::FullHash).

use crate::domain::{DatasetHash, Draw};

/// BLAKE3 over the canonical JSON of the sequence (ids, dates, sorted numbers,
/// features in field order).
pub fn dataset_hash(draws: &[Draw]) -> DatasetHash {
    let json = serde_json::to_vec(draws).expect("draws must serialize");
    DatasetHash::from_bytes(&json)
}
