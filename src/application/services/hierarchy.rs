//! Sector hierarchy service
//!
//! Scopes sector rows to one tenant, derives per-sector service counts from
//! the service links, and produces the flattened hierarchy listing.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{
    ConsolidatedRow, EntityId, MetricRecord, RollupAggregator, SectorArena, SectorId, SectorRecord,
    Snapshot, TenantId, TreeBuilder,
};

/// Distinct services a sector owns.
pub const PRIMARY_SERVICES: &str = "servicos_principal";

/// Distinct services a sector takes part in without owning them.
pub const PARTICIPANT_SERVICES: &str = "servicos_participante";

/// One line of the hierarchy listing, as the dashboard consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyRow {
    pub sector_id: SectorId,
    pub setor: String,
    pub parent_id: Option<SectorId>,
    pub nivel: usize,
    pub hierarquia: String,
    /// Comma-separated ids, root first
    pub path: String,
    pub servicos_principal_individual: u64,
    pub servicos_participante_individual: u64,
    /// Zero unless `nivel` is 0
    pub servicos_principal_consolidado: u64,
    /// Zero unless `nivel` is 0
    pub servicos_participante_consolidado: u64,
    #[serde(skip_serializing_if = "MetricRecord::is_empty")]
    pub metricas_individuais: MetricRecord,
    #[serde(skip_serializing_if = "MetricRecord::is_empty")]
    pub metricas_consolidadas: MetricRecord,
}

impl From<&ConsolidatedRow> for HierarchyRow {
    fn from(row: &ConsolidatedRow) -> Self {
        let node = &row.node;
        Self {
            sector_id: node.id,
            setor: node.title.clone(),
            parent_id: node.parent_id,
            nivel: node.level,
            hierarquia: node.breadcrumb.clone(),
            path: node.path.iter().join(","),
            servicos_principal_individual: row.individual.get(PRIMARY_SERVICES),
            servicos_participante_individual: row.individual.get(PARTICIPANT_SERVICES),
            servicos_principal_consolidado: row.consolidated.get(PRIMARY_SERVICES),
            servicos_participante_consolidado: row.consolidated.get(PARTICIPANT_SERVICES),
            metricas_individuais: extra_metrics(&row.individual),
            metricas_consolidadas: extra_metrics(&row.consolidated),
        }
    }
}

fn extra_metrics(record: &MetricRecord) -> MetricRecord {
    record
        .iter()
        .filter(|(name, _)| *name != PRIMARY_SERVICES && *name != PARTICIPANT_SERVICES)
        .collect()
}

/// Service for building tenant sector hierarchies.
#[derive(Debug, Clone, Default)]
pub struct HierarchyService {
    builder: TreeBuilder,
    aggregator: RollupAggregator,
}

impl HierarchyService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            builder: TreeBuilder::with_separator(settings.breadcrumb_separator.clone()),
            aggregator: RollupAggregator::new(),
        }
    }

    /// Active sectors of `tenant`; inactive ancestors are pruned, which turns
    /// their children into roots.
    pub fn tenant_sectors(snapshot: &Snapshot, tenant: &TenantId) -> Vec<SectorRecord> {
        snapshot
            .sectors
            .iter()
            .filter(|row| row.active && &row.tenant_id == tenant)
            .map(|row| row.to_record())
            .collect()
    }

    /// Per-sector metrics: supplied counters plus distinct primary and
    /// participant service counts from the links.
    ///
    /// Sectors with neither links nor supplied counters get no entry.
    pub fn sector_metrics(snapshot: &Snapshot) -> HashMap<SectorId, MetricRecord> {
        let mut metrics: HashMap<SectorId, MetricRecord> = snapshot
            .sector_metrics
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect();

        let mut services: HashMap<SectorId, (BTreeSet<EntityId>, BTreeSet<EntityId>)> = HashMap::new();
        for link in &snapshot.service_sectors {
            let (primary, participant) = services.entry(link.sector_id).or_default();
            if link.is_primary {
                primary.insert(link.service_id);
            } else {
                participant.insert(link.service_id);
            }
        }

        for (sector_id, (primary, participant)) in services {
            let record = metrics.entry(sector_id).or_default();
            record.set(PRIMARY_SERVICES, primary.len() as u64);
            record.set(PARTICIPANT_SERVICES, participant.len() as u64);
        }

        metrics
    }

    /// Nodes of the tenant forest with individual and consolidated metrics.
    #[instrument(level = "debug", skip_all, fields(tenant = %tenant))]
    pub fn consolidate(
        &self,
        snapshot: &Snapshot,
        tenant: &TenantId,
    ) -> ApplicationResult<Vec<ConsolidatedRow>> {
        let sectors = Self::tenant_sectors(snapshot, tenant);
        let nodes = self.builder.build_forest(&sectors)?;
        let metrics = Self::sector_metrics(snapshot);
        let rows = self.aggregator.rollup(&nodes, &metrics);
        debug!(sectors = sectors.len(), rows = rows.len(), "hierarchy consolidated");
        Ok(rows)
    }

    /// The flattened hierarchy listing, parents before descendants.
    pub fn listing(
        &self,
        snapshot: &Snapshot,
        tenant: &TenantId,
    ) -> ApplicationResult<Vec<HierarchyRow>> {
        Ok(self
            .consolidate(snapshot, tenant)?
            .iter()
            .map(HierarchyRow::from)
            .collect())
    }

    /// The tenant forest as arena trees, one per root.
    pub fn forest(&self, snapshot: &Snapshot, tenant: &TenantId) -> ApplicationResult<Vec<SectorArena>> {
        let sectors = Self::tenant_sectors(snapshot, tenant);
        Ok(self.builder.build_arenas(&sectors)?)
    }
}
