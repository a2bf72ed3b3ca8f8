//! End-to-end scenarios through the public chronidx API
//!
//! Everything here goes through the facade re-exports only, the way an
//! embedding storage engine would.

use chronidx::{
    CompositeIndexAccessor, EntityId, EntryCount, EntryScan, FlushPacing, IndexAccessor,
    IndexDescriptor, IndexReader, IndexUpdate, IndexUpdater, ResultOrdering, StoreConfig,
    TemporalKind, TemporalValue, UpdateMode, ValuePredicate,
};
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use std::ops::Bound;

fn open(dir: &std::path::Path) -> CompositeIndexAccessor {
    CompositeIndexAccessor::open(IndexDescriptor::new(1, false), dir, StoreConfig::default())
        .unwrap()
}

#[test]
fn test_all_six_kinds_index_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = open(dir.path());

    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    let east = FixedOffset::east_opt(3600).unwrap();
    let values = [
        TemporalValue::date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        TemporalValue::local_datetime(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        ),
        TemporalValue::zoned_datetime("2024-03-01T09:30:00+01:00".parse().unwrap()),
        TemporalValue::local_time(noon),
        TemporalValue::zoned_time(noon, east),
        TemporalValue::duration(0, 1, 3600, 0),
    ];

    let mut updater = accessor.new_updater(UpdateMode::Online).unwrap();
    for (i, value) in values.iter().enumerate() {
        updater
            .apply(IndexUpdate::added(EntityId(i as u64 + 1), *value))
            .unwrap();
    }
    updater.close().unwrap();
    accessor.force(FlushPacing::Unlimited).unwrap();

    // One part file per kind
    let mut scan = accessor.entry_scan().unwrap();
    assert_eq!(scan.size(), EntryCount::Exact(6));
    scan.close().unwrap();
    for kind in TemporalKind::ALL {
        assert!(
            dir.path().join(format!("{}.part", kind.file_stem())).exists(),
            "missing part file for {kind}"
        );
    }

    // Each value finds exactly its own entity
    let reader = accessor.new_reader().unwrap();
    for (i, value) in values.iter().enumerate() {
        let hits = reader
            .query(&ValuePredicate::exact(*value), ResultOrdering::Unordered)
            .unwrap();
        assert_eq!(hits, vec![EntityId(i as u64 + 1)], "kind {}", value.kind());
    }
    accessor.close().unwrap();
}

#[test]
fn test_date_range_query_is_value_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = open(dir.path());

    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut updater = accessor.new_updater(UpdateMode::Online).unwrap();
    for offset in [5i64, 1, 9, 3, 7] {
        updater
            .apply(IndexUpdate::added(
                EntityId(offset as u64),
                TemporalValue::date(base + chrono::Duration::days(offset)),
            ))
            .unwrap();
    }
    updater.close().unwrap();

    let reader = accessor.new_reader().unwrap();
    let hits = reader
        .query(
            &ValuePredicate::range(
                TemporalKind::Date,
                Bound::Included(TemporalValue::date(base + chrono::Duration::days(2))),
                Bound::Included(TemporalValue::date(base + chrono::Duration::days(8))),
            ),
            ResultOrdering::ByValue,
        )
        .unwrap();
    let entities: Vec<u64> = hits.iter().map(|e| e.as_u64()).collect();
    assert_eq!(entities, vec![3, 5, 7]);
    accessor.close().unwrap();
}

#[test]
fn test_recovery_replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = IndexDescriptor::new(3, false);
    let value = TemporalValue::duration(0, 0, 90, 0);

    let accessor =
        CompositeIndexAccessor::open(descriptor.clone(), dir.path(), StoreConfig::default())
            .unwrap();
    let mut updater = accessor.new_updater(UpdateMode::Online).unwrap();
    updater
        .apply(IndexUpdate::added(EntityId(1), value))
        .unwrap();
    updater.close().unwrap();
    accessor.force(FlushPacing::Unlimited).unwrap();
    accessor.close().unwrap();

    // Crash-recovery replays the same logged update once more
    let recovered =
        CompositeIndexAccessor::open(descriptor, dir.path(), StoreConfig::default()).unwrap();
    let mut replay = recovered.new_updater(UpdateMode::Recovery).unwrap();
    replay
        .apply(IndexUpdate::added(EntityId(1), value))
        .unwrap();
    replay.close().unwrap();

    let mut scan = recovered.entry_scan().unwrap();
    assert_eq!(scan.size(), EntryCount::Exact(1));
    scan.close().unwrap();
    recovered.close().unwrap();
}

#[test]
fn test_unsupported_values_never_touch_disk() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = open(dir.path());

    let mut updater = accessor.new_updater(UpdateMode::Online).unwrap();
    updater
        .apply(IndexUpdate {
            entity: EntityId(1),
            before: None,
            after: Some(chronidx::IndexValue::Unsupported),
        })
        .unwrap();
    updater.close().unwrap();

    // No value of a supported kind ever arrived: no part files at all
    let remaining: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(remaining.is_empty());
    accessor.close().unwrap();
}
