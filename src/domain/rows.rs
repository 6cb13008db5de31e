//! Row shapes delivered by the storage layer.
//!
//! A [`Snapshot`] bundles every row kind; it is what a snapshot file holds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    EntityId, MetricRecord, RatedEntity, RatingHistogram, SectorId, SectorRecord, TenantId,
};

fn default_true() -> bool {
    true
}

/// A sector row as stored, across all tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRow {
    pub id: SectorId,
    #[serde(default)]
    pub parent_id: Option<SectorId>,
    pub title: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub tenant_id: TenantId,
}

impl SectorRow {
    pub fn to_record(&self) -> SectorRecord {
        SectorRecord::new(self.id, self.parent_id, self.title.clone())
    }
}

/// Link between a service and a sector taking part in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSectorLink {
    pub service_id: EntityId,
    pub sector_id: SectorId,
    /// The sector owns the service rather than merely participating
    #[serde(default)]
    pub is_primary: bool,
}

/// Rating data for one entity, either per-star counts or an already reduced mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingObservation {
    Histogram {
        count_1: u64,
        count_2: u64,
        count_3: u64,
        count_4: u64,
        count_5: u64,
        #[serde(default)]
        total_votes: Option<u64>,
    },
    Reduced {
        #[serde(default)]
        mean: Option<f64>,
        votes: u64,
    },
}

impl RatingObservation {
    pub fn histogram(&self) -> Option<RatingHistogram> {
        match self {
            Self::Histogram {
                count_1,
                count_2,
                count_3,
                count_4,
                count_5,
                ..
            } => Some(RatingHistogram::new([
                *count_1, *count_2, *count_3, *count_4, *count_5,
            ])),
            Self::Reduced { .. } => None,
        }
    }

    /// Unrounded mean and vote count.
    pub fn mean_and_votes(&self) -> (Option<f64>, u64) {
        match self {
            Self::Reduced { mean, votes } => (*mean, *votes),
            Self::Histogram { .. } => self
                .histogram()
                .map_or((None, 0), |h| (h.raw_mean(), h.total())),
        }
    }
}

/// Aggregated ratings of a sector or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(flatten)]
    pub observation: RatingObservation,
}

impl RatingRow {
    /// Histogram rows derive mean and votes from the star counts.
    pub fn to_entity(&self) -> RatedEntity {
        let (mean, votes) = self.observation.mean_and_votes();
        RatedEntity::new(self.entity_id, self.name.clone(), mean, votes).with_active(self.active)
    }
}

/// Everything the storage layer would return, for all tenants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub sectors: Vec<SectorRow>,
    pub service_sectors: Vec<ServiceSectorLink>,
    /// Extra counters supplied per sector id
    pub sector_metrics: BTreeMap<SectorId, MetricRecord>,
    pub sector_ratings: Vec<RatingRow>,
    pub service_ratings: Vec<RatingRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_histogram_row_when_parsing_then_derives_mean_and_votes() {
        let row: RatingRow = serde_json::from_str(
            r#"{"tenant_id": "t1", "entity_id": 3, "name": "Saúde",
                "count_1": 0, "count_2": 0, "count_3": 2, "count_4": 0, "count_5": 2,
                "total_votes": 4}"#,
        )
        .unwrap();

        let entity = row.to_entity();
        assert_eq!(entity.votes, 4);
        assert_eq!(entity.mean, Some(4.0));
        assert!(entity.active);
    }

    #[test]
    fn given_star_counts_summing_past_u64_when_converting_then_saturates_votes() {
        let row: RatingRow = serde_json::from_str(
            r#"{"tenant_id": "t1", "entity_id": 4, "name": "Viral",
                "count_1": 0, "count_2": 0, "count_3": 0,
                "count_4": 10000000000000000000, "count_5": 10000000000000000000}"#,
        )
        .unwrap();

        let entity = row.to_entity();
        assert_eq!(entity.votes, u64::MAX);
        assert_eq!(entity.mean, Some(4.5));
    }

    #[test]
    fn given_reduced_row_when_parsing_then_keeps_mean() {
        let row: RatingRow = serde_json::from_str(
            r#"{"tenant_id": "t1", "entity_id": 9, "name": "Vacina", "mean": 4.5, "votes": 12, "active": false}"#,
        )
        .unwrap();

        let entity = row.to_entity();
        assert_eq!(entity.mean, Some(4.5));
        assert_eq!(entity.votes, 12);
        assert!(!entity.active);
    }

    #[test]
    fn given_sector_row_without_optional_fields_when_parsing_then_defaults() {
        let row: SectorRow =
            serde_json::from_str(r#"{"id": 1, "title": "Saúde", "tenant_id": "t1"}"#).unwrap();
        assert_eq!(row.parent_id, None);
        assert!(row.active);
    }
}
