//! Application services

pub mod hierarchy;
pub mod ranking;

pub use hierarchy::{HierarchyRow, HierarchyService, PARTICIPANT_SERVICES, PRIMARY_SERVICES};
pub use ranking::{EntityKind, RankingFilter, RankingRow, RankingService};
