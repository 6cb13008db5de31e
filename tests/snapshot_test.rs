//! Integration tests for snapshot loading and the service container.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use sectorank::application::services::{EntityKind, RankingFilter};
use sectorank::cli::CliError;
use sectorank::config::Settings;
use sectorank::domain::TenantId;
use sectorank::exitcode;
use sectorank::infrastructure::{InfraError, ServiceContainer};
use sectorank::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

const SNAPSHOT: &str = include_str!("resources/snapshot.json");

fn write_snapshot(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("snapshot.json");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn given_snapshot_file_when_loading_then_reads_all_row_kinds() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(dir.path(), SNAPSHOT);
    let container = ServiceContainer::new(Settings::default());

    // Act
    let snapshot = container.snapshots.load(&path).unwrap();

    // Assert
    assert_eq!(snapshot.sectors.len(), 7);
    assert_eq!(snapshot.service_sectors.len(), 7);
    assert_eq!(snapshot.sector_ratings.len(), 4);
    assert_eq!(snapshot.service_ratings.len(), 6);
    assert!(snapshot.service_ratings[0].observation.histogram().is_some());
    assert!(snapshot.service_ratings[1].observation.histogram().is_none());
}

#[test]
fn given_missing_file_when_loading_then_not_found_with_noinput_exit() {
    let dir = TempDir::new().unwrap();
    let container = ServiceContainer::new(Settings::default());

    let err = container
        .snapshots
        .load(&dir.path().join("absent.json"))
        .unwrap_err();

    assert!(matches!(err, InfraError::SnapshotNotFound(_)));
    assert_eq!(CliError::from(err).exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_malformed_file_when_loading_then_snapshot_error_with_dataerr_exit() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(dir.path(), r#"{ "sectors": [ { "id": "one" } ] }"#);
    let container = ServiceContainer::new(Settings::default());

    let err = container.snapshots.load(&path).unwrap_err();

    assert!(matches!(err, InfraError::Snapshot { .. }));
    assert_eq!(CliError::from(err).exit_code(), exitcode::DATAERR);
}

#[test]
fn given_empty_object_when_loading_then_all_row_kinds_default_to_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(dir.path(), "{}");
    let container = ServiceContainer::new(Settings::default());

    let rows = container
        .hierarchy_listing(&path, &TenantId::from("pmx"))
        .unwrap();

    assert!(rows.is_empty());
}

#[test]
fn given_cached_listing_when_file_changes_then_serves_cache_until_invalidated() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(dir.path(), SNAPSHOT);
    let container = ServiceContainer::new(Settings::default());
    let tenant = TenantId::from("pmx");
    let first = container.hierarchy_listing(&path, &tenant).unwrap();

    // Act
    write_snapshot(dir.path(), "{}");
    let cached = container.hierarchy_listing(&path, &tenant).unwrap();
    container.invalidate_listings();
    let reloaded = container.hierarchy_listing(&path, &tenant).unwrap();

    // Assert
    assert_eq!(first.len(), 5);
    assert_eq!(cached.len(), 5);
    assert!(reloaded.is_empty());
}

#[test]
fn given_cyclic_snapshot_when_listing_then_dataerr_exit() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(
        dir.path(),
        r#"{ "sectors": [
            { "id": 1, "parent_id": 2, "title": "A", "tenant_id": "t" },
            { "id": 2, "parent_id": 1, "title": "B", "tenant_id": "t" }
        ] }"#,
    );
    let container = ServiceContainer::new(Settings::default());

    let err = container
        .hierarchy_listing(&path, &TenantId::from("t"))
        .unwrap_err();

    assert_eq!(CliError::from(err).exit_code(), exitcode::DATAERR);
}

#[test]
fn given_container_when_ranking_then_uses_configured_shrinkage() {
    // Arrange: k = 0 leaves every score at its own mean
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(dir.path(), SNAPSHOT);
    let settings = Settings {
        shrinkage_k: 0.0,
        ..Settings::default()
    };
    let container = ServiceContainer::new(settings);

    // Act
    let rows = container
        .ranking(
            &path,
            &TenantId::from("pmx"),
            EntityKind::Service,
            &RankingFilter::default(),
        )
        .unwrap();

    // Assert
    assert!(rows.iter().all(|r| r.result.score == r.result.mean));
    assert_eq!(rows[0].result.id, 500);
}
