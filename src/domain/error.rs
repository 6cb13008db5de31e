//! Domain-level errors (no external dependencies)

use itertools::Itertools;
use thiserror::Error;

use crate::domain::entities::{EntityId, SectorId};

/// Domain errors represent violations of the hierarchy and scoring invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Sectors that no root reaches: they sit on, or below, a parent cycle.
    #[error("cycle detected in sector hierarchy: {}", .ids.iter().join(", "))]
    HierarchyCycle { ids: Vec<SectorId> },

    #[error("invalid shrinkage input: {parameter} = {value}")]
    InvalidShrinkage { parameter: &'static str, value: f64 },

    #[error("invalid mean rating for entity {entity_id}: {value}")]
    InvalidRating { entity_id: EntityId, value: f64 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
