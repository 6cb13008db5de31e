//! Ranking service
//!
//! Scores a tenant's sectors or services against the tenant-wide mean rating.
//! The mean always comes from the whole eligible tenant population, so ranking
//! a filtered subset does not move the prior.

use std::collections::HashSet;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, instrument, warn};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{
    global_mean, EntityId, RankingResult, RankingScorer, RatedEntity, RatingObservation, RatingRow,
    Snapshot, TenantId,
};

/// What is being ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Sector,
    Service,
}

impl EntityKind {
    /// Key under which the entity name is published.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Sector => "setor",
            EntityKind::Service => "servico",
        }
    }

    fn rows(self, snapshot: &Snapshot) -> &[RatingRow] {
        match self {
            EntityKind::Sector => &snapshot.sector_ratings,
            EntityKind::Service => &snapshot.service_ratings,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Restricts which entities are listed. The prior is unaffected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingFilter {
    /// Only rank these ids
    pub only: Option<HashSet<EntityId>>,
    /// Keep at most this many rows
    pub limit: Option<usize>,
}

/// One line of the ranking listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub kind: EntityKind,
    /// 1-based
    pub position: usize,
    pub result: RankingResult,
}

impl Serialize for RankingRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("posicao", &self.position)?;
        map.serialize_entry("id", &self.result.id)?;
        map.serialize_entry(self.kind.label(), &self.result.name)?;
        map.serialize_entry("media", &self.result.mean)?;
        map.serialize_entry("total_votes", &self.result.votes)?;
        map.serialize_entry("score_ponderado", &self.result.score)?;
        map.end()
    }
}

/// Service for shrinkage-weighted rankings.
#[derive(Debug, Clone)]
pub struct RankingService {
    shrinkage_k: f64,
    decimals: u32,
}

impl RankingService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            shrinkage_k: settings.shrinkage_k,
            decimals: settings.score_decimals,
        }
    }

    /// Rated entities of `tenant` from `rows`.
    pub fn tenant_entities(rows: &[RatingRow], tenant: &TenantId) -> Vec<RatedEntity> {
        rows.iter()
            .filter(|row| &row.tenant_id == tenant)
            .inspect(|row| warn_on_vote_mismatch(row))
            .map(RatingRow::to_entity)
            .collect()
    }

    /// Rank the tenant's entities of `kind`, best first.
    ///
    /// Returns an empty listing when the tenant has no eligible entity.
    #[instrument(level = "debug", skip_all, fields(tenant = %tenant, kind = %kind))]
    pub fn rank(
        &self,
        snapshot: &Snapshot,
        tenant: &TenantId,
        kind: EntityKind,
        filter: &RankingFilter,
    ) -> ApplicationResult<Vec<RankingRow>> {
        let population = Self::tenant_entities(kind.rows(snapshot), tenant);
        let Some(prior) = global_mean(&population)? else {
            debug!(entities = population.len(), "no eligible entities, nothing to rank");
            return Ok(Vec::new());
        };
        debug!(prior, entities = population.len(), "tenant-wide mean computed");

        let scorer =
            RankingScorer::with_shrinkage(prior, self.shrinkage_k)?.with_decimals(self.decimals);

        let candidates: Vec<RatedEntity> = match &filter.only {
            Some(ids) => population
                .into_iter()
                .filter(|e| ids.contains(&e.id))
                .collect(),
            None => population,
        };

        let rows = scorer
            .score(&candidates)?
            .into_iter()
            .take(filter.limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(i, result)| RankingRow {
                kind,
                position: i + 1,
                result,
            })
            .collect();
        Ok(rows)
    }
}

fn warn_on_vote_mismatch(row: &RatingRow) {
    if let RatingObservation::Histogram {
        total_votes: Some(declared),
        ..
    } = &row.observation
    {
        let counted = row.observation.histogram().map_or(0, |h| h.total());
        if *declared != counted {
            warn!(
                entity = row.entity_id,
                declared, counted, "total_votes disagrees with star counts, using star counts"
            );
        }
    }
}
