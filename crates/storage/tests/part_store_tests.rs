//! Integration tests for the file-backed part store
//!
//! These exercise a store the way the composite layer does: full
//! bootstrap/open/write/force/scan/close lifecycles, persistence across
//! reopens, and concurrent access through a shared handle.

use chronidx_core::{
    CollectingReporter, EntityId, EntryCount, EntryScan, FlushPacing, IndexError, KeyProbe,
    PartStorage, PartWrite, PartWriter, TemporalKind, TemporalValue, UpdateMode,
};
use chronidx_storage::{FilePartStore, StoreConfig};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

// ============================================================================
// Helper Functions
// ============================================================================

fn time_key(nanos: i64) -> chronidx_core::OrderKey {
    TemporalValue::LocalTime {
        nanos_of_day: nanos,
    }
    .order_key()
}

fn bootstrap_store(dir: &Path, uuid: Uuid) -> FilePartStore {
    FilePartStore::bootstrap(
        &dir.join("local-time.part"),
        TemporalKind::LocalTime,
        uuid,
        StoreConfig::default(),
    )
    .unwrap()
}

fn add_entries(store: &FilePartStore, entries: &[(i64, u64)]) {
    let mut writer = store.begin_write(UpdateMode::Online).unwrap();
    for &(nanos, entity) in entries {
        writer
            .apply(PartWrite::Add {
                key: time_key(nanos),
                entity: EntityId(entity),
            })
            .unwrap();
    }
    writer.close().unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_full_lifecycle_with_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let uuid = Uuid::new_v4();

    let store = bootstrap_store(dir.path(), uuid);
    add_entries(&store, &[(100, 1), (200, 2), (300, 3)]);
    store.force(FlushPacing::Unlimited).unwrap();

    let mut writer = store.begin_write(UpdateMode::Online).unwrap();
    writer
        .apply(PartWrite::Remove {
            key: time_key(200),
            entity: EntityId(2),
        })
        .unwrap();
    writer.close().unwrap();
    store.close().unwrap();

    let reopened = FilePartStore::open(
        &dir.path().join("local-time.part"),
        TemporalKind::LocalTime,
        uuid,
        StoreConfig::default(),
    )
    .unwrap();
    assert_eq!(reopened.entry_count(), 2);
    assert!(reopened
        .read(&KeyProbe::Exact(time_key(200)))
        .unwrap()
        .is_empty());

    let hits = reopened
        .read(&KeyProbe::Range {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        })
        .unwrap();
    let entities: Vec<u64> = hits.iter().map(|e| e.entity.as_u64()).collect();
    assert_eq!(entities, vec![1, 3]);
}

#[test]
fn test_reopened_store_is_clean_and_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let uuid = Uuid::new_v4();

    let store = bootstrap_store(dir.path(), uuid);
    add_entries(&store, &[(1, 1)]);
    store.close().unwrap();

    let reopened = FilePartStore::open(
        &dir.path().join("local-time.part"),
        TemporalKind::LocalTime,
        uuid,
        StoreConfig::default(),
    )
    .unwrap();
    assert!(!reopened.is_dirty());

    let reporter = CollectingReporter::new();
    assert!(reopened.consistency_check(&reporter).unwrap());
    assert!(reporter.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_readers_and_writer() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(bootstrap_store(dir.path(), Uuid::new_v4()));
    add_entries(&store, &[(1, 1), (2, 2), (3, 3)]);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let hits = store.read(&KeyProbe::All).unwrap();
                assert!(hits.len() >= 3);
            }
        }));
    }

    let writer_store = Arc::clone(&store);
    handles.push(thread::spawn(move || {
        for i in 0..20 {
            let mut writer = writer_store.begin_write(UpdateMode::Online).unwrap();
            writer
                .apply(PartWrite::Add {
                    key: time_key(1000 + i),
                    entity: EntityId(100 + i as u64),
                })
                .unwrap();
            writer.close().unwrap();
        }
    }));

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.entry_count(), 23);
    assert_eq!(store.active_leases(), 0);
}

// ============================================================================
// Scans
// ============================================================================

#[test]
fn test_scan_sees_point_in_time_count() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrap_store(dir.path(), Uuid::new_v4());
    add_entries(&store, &[(1, 1), (2, 2)]);

    let mut scan = store.entry_scan().unwrap();
    assert_eq!(scan.size(), EntryCount::Exact(2));

    let mut count = 0;
    while scan.next().is_some() {
        count += 1;
    }
    assert_eq!(count, 2);
    scan.close().unwrap();
}

#[test]
fn test_scan_after_drop_storage_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrap_store(dir.path(), Uuid::new_v4());
    add_entries(&store, &[(1, 1)]);

    let mut scan = store.entry_scan().unwrap();
    store.drop_storage().unwrap();

    // The part is gone; a scan that never materialized yields nothing
    assert!(scan.next().is_none());
    scan.close().unwrap();
    assert_eq!(store.active_leases(), 0);
}

#[test]
fn test_closed_store_rejects_new_scans() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrap_store(dir.path(), Uuid::new_v4());
    store.close().unwrap();

    assert!(matches!(store.entry_scan(), Err(IndexError::ClosedAccessor)));
    assert!(matches!(
        store.snapshot_files(),
        Err(IndexError::ClosedAccessor)
    ));
}
