//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::instrument;

use crate::application::services::{
    EntityKind, HierarchyRow, HierarchyService, RankingFilter, RankingRow, RankingService,
};
use crate::application::TtlCache;
use crate::config::Settings;
use crate::domain::{SectorArena, TenantId};
use crate::infrastructure::snapshot::SnapshotLoader;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

type ListingKey = (PathBuf, TenantId);

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub snapshots: SnapshotLoader,
    pub hierarchy: HierarchyService,
    pub ranking: RankingService,

    /// Hierarchy listings per snapshot and tenant
    listings: TtlCache<ListingKey, Vec<HierarchyRow>>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self {
            snapshots: SnapshotLoader::new(Arc::clone(&fs)),
            hierarchy: HierarchyService::new(&settings),
            ranking: RankingService::new(&settings),
            listings: TtlCache::new(settings.cache_ttl()),
            settings,
            fs,
        }
    }

    /// Hierarchy listing for `tenant`, served from the cache while fresh.
    #[instrument(level = "debug", skip(self))]
    pub fn hierarchy_listing(
        &self,
        snapshot: &Path,
        tenant: &TenantId,
    ) -> InfraResult<Arc<Vec<HierarchyRow>>> {
        let key = (snapshot.to_path_buf(), tenant.clone());
        self.listings
            .get_or_try_insert_with(key, || -> InfraResult<Vec<HierarchyRow>> {
                let loaded = self.snapshots.load(snapshot)?;
                Ok(self.hierarchy.listing(&loaded, tenant)?)
            })
    }

    /// Arena trees of the tenant forest.
    #[instrument(level = "debug", skip(self))]
    pub fn hierarchy_forest(
        &self,
        snapshot: &Path,
        tenant: &TenantId,
    ) -> InfraResult<Vec<SectorArena>> {
        let loaded = self.snapshots.load(snapshot)?;
        Ok(self.hierarchy.forest(&loaded, tenant)?)
    }

    /// Ranking of the tenant's sectors or services.
    #[instrument(level = "debug", skip(self))]
    pub fn ranking(
        &self,
        snapshot: &Path,
        tenant: &TenantId,
        kind: EntityKind,
        filter: &RankingFilter,
    ) -> InfraResult<Vec<RankingRow>> {
        let loaded = self.snapshots.load(snapshot)?;
        Ok(self.ranking.rank(&loaded, tenant, kind, filter)?)
    }

    /// Forget cached listings, e.g. after the snapshot changed.
    pub fn invalidate_listings(&self) {
        self.listings.clear();
    }
}
