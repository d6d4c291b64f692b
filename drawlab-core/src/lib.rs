//! DrawLab Core: draw domain types, weighting pipeline, backtest and forecast engines.
//!
//! This crate contains the deterministic heart of DrawLab:
//! - Domain types (draws, categorical features, weight vectors, tickets)
//! - The 32-bit LCG every ticket is sampled from
//! - Weight components (base, frequency, recency, astro similarity)
//! - Adaptive blender with decaying component scores
//! - Hot/cold adjustment and weighted sampling without replacement
//! - Draw-by-draw backtest loop with mergeable hit accumulators
//! - Forward forecast for an upcoming draw
//!
//! Nothing here touches the filesystem; loading and export live in `drawlab-runner`.

pub mod components;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod rng;
