//! Multi-factor ranking of subtitle search results.
//!
//! Every result is scored on five bounded factors that are combined with
//! fixed weights into its `match_score`; results are then ordered by score
//! with deterministic tie-breaking.

mod config;
mod dedup;
mod scoring;

pub use config::RankerConfig;
pub use dedup::deduplicate_results;
pub use scoring::{
    sort_results, ResultRanker, ScoreBreakdown, CONTENT_QUALITY_WEIGHT, MATCH_ACCURACY_WEIGHT,
    PROVIDER_RELIABILITY_WEIGHT, TECHNICAL_WEIGHT, USER_PREFERENCE_WEIGHT,
};
