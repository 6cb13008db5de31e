//! Domain layer: entities, hierarchy building, rollup and ranking
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod ranking;
pub mod rollup;
pub mod rows;

pub use arena::{SectorArena, TreeNode};
pub use builder::{TreeBuilder, DEFAULT_BREADCRUMB_SEPARATOR};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use ranking::{
    global_mean, mean_from_histogram, round_to, RankingScorer, DEFAULT_SCORE_DECIMALS,
    MAX_RATING,
    DEFAULT_SHRINKAGE_K,
};
pub use rollup::RollupAggregator;
pub use rows::{RatingObservation, RatingRow, SectorRow, ServiceSectorLink, Snapshot};
