//! Render sector arenas as terminal trees.

use std::collections::HashMap;

use generational_arena::Index;
use termtree::Tree;

use crate::application::services::HierarchyRow;
use crate::domain::{SectorArena, SectorId, SectorNode};

pub trait ToTermTree {
    fn to_term_tree(&self, label: &dyn Fn(&SectorNode) -> String) -> Tree<String>;
}

impl ToTermTree for SectorArena {
    fn to_term_tree(&self, label: &dyn Fn(&SectorNode) -> String) -> Tree<String> {
        fn build(
            arena: &SectorArena,
            node_idx: Index,
            label: &dyn Fn(&SectorNode) -> String,
        ) -> Option<Tree<String>> {
            let node = arena.get_node(node_idx)?;
            let leaves: Vec<_> = node
                .children
                .iter()
                .filter_map(|&child| build(arena, child, label))
                .collect();
            Some(Tree::new(label(&node.data)).with_leaves(leaves))
        }

        self.root()
            .and_then(|root| build(self, root, label))
            .unwrap_or_else(|| Tree::new("Empty tree".to_string()))
    }
}

/// Label a node with the counts a dashboard shows for it: consolidated for
/// roots, individual below.
pub fn service_count_label<'a>(
    rows: &'a HashMap<SectorId, &'a HierarchyRow>,
) -> impl Fn(&SectorNode) -> String + 'a {
    move |node: &SectorNode| match rows.get(&node.id) {
        Some(row) if row.nivel == 0 => format!(
            "{} [{}] principal={} participante={} (consolidado)",
            node.title,
            node.id,
            row.servicos_principal_consolidado,
            row.servicos_participante_consolidado
        ),
        Some(row) => format!(
            "{} [{}] principal={} participante={}",
            node.title,
            node.id,
            row.servicos_principal_individual,
            row.servicos_participante_individual
        ),
        None => format!("{} [{}]", node.title, node.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::HierarchyService;
    use crate::config::Settings;
    use crate::domain::{SectorRecord, SectorRow, ServiceSectorLink, Snapshot, TenantId, TreeBuilder};

    #[test]
    fn given_arena_when_rendering_then_nests_children() {
        let arenas = TreeBuilder::new()
            .build_arenas(&[
                SectorRecord::new(1, None, "Saúde"),
                SectorRecord::new(2, Some(1), "Vigilância"),
            ])
            .unwrap();

        let rendered = arenas[0]
            .to_term_tree(&|node: &SectorNode| node.title.clone())
            .to_string();

        assert!(rendered.starts_with("Saúde\n"));
        assert!(rendered.contains("└── Vigilância"));
    }

    #[test]
    fn given_listing_rows_when_labelling_then_roots_show_consolidated_counts() {
        // Arrange
        let snapshot = Snapshot {
            sectors: vec![
                SectorRow {
                    id: 1,
                    parent_id: None,
                    title: "Saúde".to_string(),
                    active: true,
                    tenant_id: TenantId::from("t1"),
                },
                SectorRow {
                    id: 2,
                    parent_id: Some(1),
                    title: "Vigilância".to_string(),
                    active: true,
                    tenant_id: TenantId::from("t1"),
                },
            ],
            service_sectors: vec![ServiceSectorLink {
                service_id: 9,
                sector_id: 2,
                is_primary: true,
            }],
            ..Snapshot::default()
        };
        let service = HierarchyService::new(&Settings::default());
        let tenant = TenantId::from("t1");
        let rows = service.listing(&snapshot, &tenant).unwrap();
        let arenas = service.forest(&snapshot, &tenant).unwrap();
        let by_id: HashMap<SectorId, &HierarchyRow> =
            rows.iter().map(|row| (row.sector_id, row)).collect();

        // Act
        let label = service_count_label(&by_id);
        let rendered = arenas[0].to_term_tree(&label).to_string();

        // Assert
        assert!(rendered.starts_with("Saúde [1] principal=1 participante=0 (consolidado)"));
        assert!(rendered.contains("Vigilância [2] principal=1 participante=0"));
    }
}
