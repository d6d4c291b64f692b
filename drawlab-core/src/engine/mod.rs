//! Backtesting engine: the draw-by-draw loop, the forward forecast, and the
//! parameter and accumulator types they share.
//!
//! For every target index the loop:
//!
//! 1. Builds the window of draws immediately before the target
//! 2. Computes the weight components against the target's features
//! 3. Scores the components on the true numbers and updates the blender
//! 4. Blends, applies hot/cold, and samples the tickets
//! 5. Records hits and entropy

pub mod accumulator;
pub mod forecast;
pub mod loop_runner;
pub mod params;

use thiserror::Error;

use crate::domain::Draw;

pub use accumulator::{HitAccumulator, HitRates};
pub use forecast::{forecast, Forecast, ForecastOptions, ScoredTicket};
pub use loop_runner::{BacktestRun, BacktestRunner, DrawRecord, RunSummary};
pub use params::{ParamError, RunOptions, WeightingParams};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamError),
    #[error("draws are not in ascending id order: {previous} followed by {next}")]
    NotChronological { previous: u32, next: u32 },
}

/// The up-to-`size` draws immediately before index `end`, oldest first.
pub fn window(draws: &[Draw], end: usize, size: usize) -> &[Draw] {
    &draws[end.saturating_sub(size)..end]
}

/// Ids must be strictly increasing.
pub fn check_chronological(draws: &[Draw]) -> Result<(), EngineError> {
    match draws.windows(2).find(|pair| pair[0].id >= pair[1].id) {
        Some(pair) => Err(EngineError::NotChronological {
            previous: pair[0].id,
            next: pair[1].id,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draw(id: u32) -> Draw {
        let n = (id % 50) as i64 + 1;
        Draw::new(
            id,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            &[n, n + 1, n + 2, n + 3, n + 4, n + 5],
            None,
        )
        .unwrap()
    }

    #[test]
    fn window_clamps_at_start() {
        let draws: Vec<Draw> = (1..=10).map(draw).collect();
        assert_eq!(window(&draws, 3, 5).len(), 3);
        let w = window(&draws, 8, 5);
        assert_eq!(w.first().map(|d| d.id), Some(4));
        assert_eq!(w.last().map(|d| d.id), Some(8));
        assert!(window(&draws, 0, 5).is_empty());
    }

    #[test]
    fn chronological_check() {
        let ok: Vec<Draw> = [1, 2, 5].into_iter().map(draw).collect();
        assert_eq!(check_chronological(&ok), Ok(()));

        let bad: Vec<Draw> = [1, 3, 3].into_iter().map(draw).collect();
        assert_eq!(
            check_chronological(&bad),
            Err(EngineError::NotChronological { previous: 3, next: 3 })
        );
    }
}
