//! Tree builder: flattens parent-linked sector records into a leveled forest.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::arena::SectorArena;
use crate::domain::entities::{SectorId, SectorNode, SectorRecord};
use crate::domain::error::{DomainError, DomainResult};

/// Separator placed between titles in a breadcrumb.
pub const DEFAULT_BREADCRUMB_SEPARATOR: &str = " > ";

/// Constructs sector forests from flat records.
///
/// Stateless: every call rebuilds the forest from its input alone.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    separator: String,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_BREADCRUMB_SEPARATOR)
    }

    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Flatten `sectors` into one node per distinct sector id, sorted by path.
    ///
    /// Records whose parent is missing from the input become roots. When an id
    /// shows up on more than one edge, the first assignment in breadth-first
    /// order (hence the lowest level) is kept and the other edges are dropped.
    ///
    /// # Errors
    ///
    /// [`DomainError::HierarchyCycle`] names every id no root reaches.
    #[instrument(level = "debug", skip(self, sectors), fields(records = sectors.len()))]
    pub fn build_forest(&self, sectors: &[SectorRecord]) -> DomainResult<Vec<SectorNode>> {
        let known: HashSet<SectorId> = sectors.iter().map(|s| s.id).collect();

        // Adjacency: parent id -> child records
        let mut children: HashMap<SectorId, Vec<&SectorRecord>> = HashMap::new();
        let mut roots: Vec<&SectorRecord> = Vec::new();
        for sector in sectors {
            match sector.parent_id {
                Some(parent) if known.contains(&parent) => {
                    children.entry(parent).or_default().push(sector)
                }
                _ => roots.push(sector),
            }
        }

        // Fixed visiting order so the result does not depend on input order
        roots.sort_by(|a, b| by_id_then_title(a, b));
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| by_id_then_title(a, b));
        }

        let mut assigned: HashMap<SectorId, SectorNode> = HashMap::with_capacity(known.len());
        let mut queue: VecDeque<SectorId> = VecDeque::new();

        for record in roots {
            if assigned.contains_key(&record.id) {
                trace!(sector = record.id, "duplicate root record dropped");
                continue;
            }
            assigned.insert(record.id, SectorNode::root(record));
            queue.push_back(record.id);
        }
        debug!(roots = queue.len(), "starting breadth-first traversal");

        // Each id is enqueued at most once, so this runs at most |known| times
        while let Some(parent_id) = queue.pop_front() {
            let Some(siblings) = children.get(&parent_id) else {
                continue;
            };
            let Some(parent) = assigned.get(&parent_id) else {
                continue;
            };

            let attached: Vec<SectorNode> = siblings
                .iter()
                .filter(|record| !assigned.contains_key(&record.id))
                .unique_by(|record| record.id)
                .map(|record| parent.child(record, &self.separator))
                .collect();
            let dropped = siblings.len() - attached.len();
            if dropped > 0 {
                trace!(parent = parent_id, dropped, "edges to already placed sectors dropped");
            }

            for node in attached {
                queue.push_back(node.id);
                assigned.insert(node.id, node);
            }
        }

        let mut unreached: Vec<SectorId> = known
            .iter()
            .filter(|id| !assigned.contains_key(*id))
            .copied()
            .collect();
        if !unreached.is_empty() {
            unreached.sort_unstable();
            debug!(?unreached, "sectors not reachable from any root");
            return Err(DomainError::HierarchyCycle { ids: unreached });
        }

        let mut nodes: Vec<SectorNode> = assigned.into_values().collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(nodes = nodes.len(), "forest built");
        Ok(nodes)
    }

    /// Build the forest and materialize one arena tree per root, ordered by root id.
    #[instrument(level = "debug", skip(self, sectors))]
    pub fn build_arenas(&self, sectors: &[SectorRecord]) -> DomainResult<Vec<SectorArena>> {
        let nodes = self.build_forest(sectors)?;
        Ok(Self::arenas_from_nodes(nodes))
    }

    /// Group path-sorted nodes into arena trees.
    ///
    /// Relies on parents preceding their descendants, which path order guarantees.
    pub fn arenas_from_nodes(nodes: Vec<SectorNode>) -> Vec<SectorArena> {
        let mut arenas: Vec<SectorArena> = Vec::new();
        let mut position: HashMap<SectorId, usize> = HashMap::new();

        for node in nodes {
            if node.is_root() {
                position.insert(node.id, arenas.len());
                let mut arena = SectorArena::new();
                arena.insert_node(node, None);
                arenas.push(arena);
                continue;
            }
            let Some(&slot) = position.get(&node.root_id) else {
                trace!(sector = node.id, "node without a root in this batch skipped");
                continue;
            };
            let arena = &mut arenas[slot];
            let parent = node.parent_id.and_then(|id| arena.index_of(id));
            if parent.is_none() {
                trace!(sector = node.id, "parent not yet placed, node skipped");
                continue;
            }
            arena.insert_node(node, parent);
        }

        arenas
    }
}

fn by_id_then_title(a: &SectorRecord, b: &SectorRecord) -> Ordering {
    a.id.cmp(&b.id).then_with(|| a.title.cmp(&b.title))
}
