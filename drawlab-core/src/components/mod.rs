//! Weighting pipeline: components, adaptive blending, hot/cold adjustment and
//! ticket sampling.
//!
//! For each target draw the engine computes the four [`ComponentWeights`] over
//! the window, lets the [`AdaptiveBlender`] mix them, and hands the final
//! vector to the [`WeightedSampler`].

pub mod blender;
pub mod hot_cold;
pub mod sampler;
pub mod weights;

pub use blender::{
    top_six_hits, AdaptiveBlender, BlendOutcome, BlendParams, Coefficients, ComponentHits,
    ScoreState, SCORE_DECAY,
};
pub use hot_cold::HotCold;
pub use sampler::{sample_without_replacement, WeightedSampler};
pub use weights::{Component, ComponentWeights};
