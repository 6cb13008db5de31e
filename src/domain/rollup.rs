//! Rollup of per-sector metrics onto root sectors.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, trace};

use crate::domain::entities::{ConsolidatedRow, MetricRecord, SectorId, SectorNode};

/// Sums descendant metrics onto the root of each tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollupAggregator;

impl RollupAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Produce one row per node, in the order of `nodes`.
    ///
    /// A node without an entry in `metrics` counts as the zero record and its
    /// row is flagged with `metrics_defaulted`. Each root's `consolidated`
    /// record is the sum of `individual` over every node whose path contains
    /// the root, the root included. Non-root rows keep an empty `consolidated`.
    #[instrument(level = "debug", skip_all, fields(nodes = nodes.len(), metrics = metrics.len()))]
    pub fn rollup(
        &self,
        nodes: &[SectorNode],
        metrics: &HashMap<SectorId, MetricRecord>,
    ) -> Vec<ConsolidatedRow> {
        let roots: HashSet<SectorId> = nodes.iter().filter(|n| n.is_root()).map(|n| n.id).collect();
        let mut totals: HashMap<SectorId, MetricRecord> =
            roots.iter().map(|&id| (id, MetricRecord::new())).collect();

        let mut rows = Vec::with_capacity(nodes.len());
        let mut defaulted = 0usize;
        for node in nodes {
            let (individual, metrics_defaulted) = match metrics.get(&node.id) {
                Some(record) => (record.clone(), false),
                None => {
                    trace!(sector = node.id, "no metrics supplied, using zero record");
                    defaulted += 1;
                    (MetricRecord::new(), true)
                }
            };

            for root in node.path.iter().filter(|id| roots.contains(*id)) {
                if let Some(total) = totals.get_mut(root) {
                    total.accumulate(&individual);
                }
            }

            rows.push(ConsolidatedRow {
                node: node.clone(),
                individual,
                consolidated: MetricRecord::new(),
                metrics_defaulted,
            });
        }

        for row in rows.iter_mut().filter(|r| r.node.is_root()) {
            if let Some(total) = totals.remove(&row.node.id) {
                row.consolidated = total;
            }
        }

        let placed: HashSet<SectorId> = nodes.iter().map(|n| n.id).collect();
        let ignored = metrics.keys().filter(|id| !placed.contains(*id)).count();
        debug!(roots = roots.len(), defaulted, ignored, "rollup complete");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SectorRecord;

    #[test]
    fn given_lone_root_when_rolling_up_then_consolidated_equals_individual() {
        let node = SectorNode::root(&SectorRecord::new(1, None, "Root"));
        let metrics = HashMap::from([(1, MetricRecord::new().with("primary", 4))]);

        let rows = RollupAggregator::new().rollup(&[node], &metrics);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].consolidated, rows[0].individual);
        assert!(!rows[0].metrics_defaulted);
    }

    #[test]
    fn given_no_nodes_when_rolling_up_then_no_rows() {
        let metrics = HashMap::from([(1, MetricRecord::new().with("primary", 4))]);
        assert!(RollupAggregator::new().rollup(&[], &metrics).is_empty());
    }
}
