//! Integration tests for TreeBuilder forest construction.

use rstest::rstest;

use sectorank::domain::{DomainError, SectorId, SectorNode, SectorRecord, TreeBuilder};
use sectorank::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn record(id: SectorId, parent: Option<SectorId>, title: &str) -> SectorRecord {
    SectorRecord::new(id, parent, title)
}

fn health_records() -> Vec<SectorRecord> {
    vec![
        record(1, None, "Saúde"),
        record(2, Some(1), "Vigilância"),
        record(3, Some(2), "Zoonoses"),
        record(4, Some(1), "Atenção Básica"),
        record(10, None, "Educação"),
        record(11, Some(10), "Ensino Fundamental"),
    ]
}

fn node(nodes: &[SectorNode], id: SectorId) -> &SectorNode {
    nodes
        .iter()
        .find(|n| n.id == id)
        .unwrap_or_else(|| panic!("sector {id} missing from forest"))
}

// ============================================================
// Levels, paths and breadcrumbs
// ============================================================

#[test]
fn given_three_level_chain_when_building_then_assigns_levels_paths_and_breadcrumbs() {
    // Arrange
    let records = vec![
        record(1, None, "Saúde"),
        record(2, Some(1), "Vigilância"),
        record(3, Some(2), "Zoonoses"),
    ];

    // Act
    let nodes = TreeBuilder::new().build_forest(&records).unwrap();

    // Assert
    assert_eq!(nodes.len(), 3);
    let zoonoses = node(&nodes, 3);
    assert_eq!(zoonoses.level, 2);
    assert_eq!(zoonoses.path, vec![1, 2, 3]);
    assert_eq!(zoonoses.root_id, 1);
    assert_eq!(zoonoses.breadcrumb, "Saúde > Vigilância > Zoonoses");
    assert_eq!(node(&nodes, 1).level, 0);
    assert_eq!(node(&nodes, 2).parent_id, Some(1));
}

#[test]
fn given_forest_when_building_then_nodes_are_sorted_by_path() {
    let nodes = TreeBuilder::new().build_forest(&health_records()).unwrap();

    let paths: Vec<Vec<SectorId>> = nodes.iter().map(|n| n.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            vec![1],
            vec![1, 2],
            vec![1, 2, 3],
            vec![1, 4],
            vec![10],
            vec![10, 11],
        ]
    );
}

#[test]
fn given_parent_outside_input_when_building_then_record_becomes_root() {
    // Arrange: parent 99 was filtered out (inactive or other tenant)
    let records = vec![record(5, Some(99), "Orphan"), record(6, Some(5), "Child")];

    // Act
    let nodes = TreeBuilder::new().build_forest(&records).unwrap();

    // Assert
    let orphan = node(&nodes, 5);
    assert!(orphan.is_root());
    assert_eq!(orphan.path, vec![5]);
    assert_eq!(orphan.parent_id, Some(99));
    assert_eq!(node(&nodes, 6).root_id, 5);
}

#[test]
fn given_every_node_when_building_then_path_ends_with_own_id_and_starts_with_root() {
    let nodes = TreeBuilder::new().build_forest(&health_records()).unwrap();

    for n in &nodes {
        assert_eq!(n.path.last(), Some(&n.id));
        assert_eq!(n.path.first(), Some(&n.root_id));
        assert_eq!(n.path.len(), n.level + 1);
    }
}

// ============================================================
// Determinism and deduplication
// ============================================================

#[rstest]
#[case::reversed(vec![5, 4, 3, 2, 1, 0])]
#[case::children_first(vec![2, 5, 1, 3, 0, 4])]
#[case::interleaved(vec![4, 0, 5, 1, 3, 2])]
fn given_permuted_input_when_building_then_forest_is_identical(#[case] order: Vec<usize>) {
    // Arrange
    let original = health_records();
    let permuted: Vec<SectorRecord> = order.iter().map(|&i| original[i].clone()).collect();
    let builder = TreeBuilder::new();

    // Act
    let expected = builder.build_forest(&original).unwrap();
    let actual = builder.build_forest(&permuted).unwrap();

    // Assert
    assert_eq!(actual, expected);
}

#[test]
fn given_duplicate_records_when_building_then_each_sector_appears_once() {
    let records = vec![
        record(1, None, "Saúde"),
        record(2, Some(1), "Vigilância"),
        record(2, Some(1), "Vigilância"),
    ];

    let nodes = TreeBuilder::new().build_forest(&records).unwrap();

    assert_eq!(nodes.len(), 2);
}

#[test]
fn given_sector_reachable_on_two_edges_when_building_then_shallowest_placement_wins() {
    // Arrange: sector 3 is listed both under root 1 and under 2 (itself under 1)
    let records = vec![
        record(1, None, "Root"),
        record(2, Some(1), "Middle"),
        record(3, Some(2), "Deep"),
        record(3, Some(1), "Shallow"),
    ];

    // Act
    let nodes = TreeBuilder::new().build_forest(&records).unwrap();

    // Assert
    assert_eq!(nodes.len(), 3);
    let three = node(&nodes, 3);
    assert_eq!(three.level, 1);
    assert_eq!(three.path, vec![1, 3]);
}

// ============================================================
// Cycle detection
// ============================================================

#[test]
fn given_two_sector_cycle_when_building_then_reports_hierarchy_cycle() {
    let records = vec![
        record(1, None, "Root"),
        record(20, Some(21), "A"),
        record(21, Some(20), "B"),
    ];

    let result = TreeBuilder::new().build_forest(&records);

    assert_eq!(result, Err(DomainError::HierarchyCycle { ids: vec![20, 21] }));
}

#[test]
fn given_descendant_of_cycle_when_building_then_cycle_error_names_it() {
    let records = vec![
        record(20, Some(21), "A"),
        record(21, Some(20), "B"),
        record(22, Some(21), "Below the loop"),
    ];

    let err = TreeBuilder::new().build_forest(&records).unwrap_err();

    assert_eq!(err, DomainError::HierarchyCycle { ids: vec![20, 21, 22] });
    assert!(err.to_string().contains("20, 21, 22"));
}

// ============================================================
// Arena materialization
// ============================================================

#[test]
fn given_forest_when_building_arenas_then_one_arena_per_root() {
    let arenas = TreeBuilder::new().build_arenas(&health_records()).unwrap();

    assert_eq!(arenas.len(), 2);
    assert_eq!(arenas[0].len(), 4);
    assert_eq!(arenas[1].len(), 2);
    assert_eq!(arenas[0].depth(), 3);

    let mut leaves = arenas[0].leaf_nodes();
    leaves.sort_unstable();
    assert_eq!(leaves, vec![3, 4]);
}

#[test]
fn given_arena_when_iterating_then_visits_parents_before_children() {
    let arenas = TreeBuilder::new().build_arenas(&health_records()).unwrap();

    let visited: Vec<SectorId> = arenas[0].iter().map(|(_, n)| n.data.id).collect();

    assert_eq!(visited.first(), Some(&1));
    let pos = |id| visited.iter().position(|&v| v == id).unwrap();
    assert!(pos(2) < pos(3));
}
