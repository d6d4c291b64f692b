//! Domain types for DrawLab

pub mod draw;
pub mod features;
pub mod ids;
pub mod ticket;
pub mod weights;

pub use draw::{Draw, DrawError, DOMAIN_SIZE, TICKET_SIZE};
pub use features::{
    DrawFeatures, Element, FeatureError, FeatureWeights, LunarPhase, ZodiacSign,
    FEATURE_COUNT,
};
pub use ids::{DatasetHash, FullHash};
pub use ticket::{bin_entropy, round3, Ticket};
pub use weights::WeightVector;
