//! Composite index reader
//!
//! Kind-bound predicates route to a single part; existence queries fan
//! out across every live part. When the caller needs globally
//! value-ordered output, per-part streams (each internally value-ordered)
//! go through a k-way merge on (kind precedence, order key) instead of
//! plain concatenation.

use crate::registry::Part;
use chronidx_core::{
    EntityId, IndexEntry, IndexReader, KeyProbe, OrderKey, PartStorage, Result, ResultOrdering,
    TemporalKind, ValuePredicate,
};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::warn;

/// A read session bound to the live-parts snapshot taken at creation.
pub struct CompositeIndexReader {
    parts: Vec<Part>,
    unique: bool,
}

impl CompositeIndexReader {
    /// Reader over a snapshot of parts in kind order
    pub(crate) fn new(parts: Vec<Part>, unique: bool) -> Self {
        CompositeIndexReader { parts, unique }
    }

    fn part_for(&self, kind: TemporalKind) -> Option<&Part> {
        self.parts.iter().find(|part| part.kind() == kind)
    }

    fn query_single_part(
        &self,
        kind: TemporalKind,
        predicate: &ValuePredicate,
    ) -> Result<Vec<EntityId>> {
        // Validate first so a malformed predicate fails even when the
        // target part does not exist
        let probe = predicate.key_probe()?;
        let Some(part) = self.part_for(kind) else {
            // No part for the kind means no values of that kind were ever
            // indexed: empty result, not an error
            return Ok(Vec::new());
        };
        let entries = part.storage().read(&probe)?;

        if self.unique && matches!(predicate, ValuePredicate::Exact(_)) && entries.len() > 1 {
            // A duplicate inside one part is that part's consistency
            // violation, not this layer's; surfaced by the check, not here
            warn!(kind = %kind, hits = entries.len(), "unique index returned multiple entities for one value");
        }
        Ok(entries.into_iter().map(|entry| entry.entity).collect())
    }

    fn query_all_parts(&self, ordering: ResultOrdering) -> Result<Vec<EntityId>> {
        let mut streams = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            streams.push((part.kind(), part.storage().read(&KeyProbe::All)?));
        }
        Ok(match ordering {
            ResultOrdering::Unordered => streams
                .into_iter()
                .flat_map(|(_, entries)| entries)
                .map(|entry| entry.entity)
                .collect(),
            ResultOrdering::ByValue => merge_by_value(streams),
        })
    }
}

impl IndexReader for CompositeIndexReader {
    fn query(
        &self,
        predicate: &ValuePredicate,
        ordering: ResultOrdering,
    ) -> Result<Vec<EntityId>> {
        match predicate.kind() {
            Some(kind) => self.query_single_part(kind, predicate),
            None => self.query_all_parts(ordering),
        }
    }
}

/// K-way merge of per-part entry streams into global value order:
/// kind precedence first, then in-kind key order.
fn merge_by_value(streams: Vec<(TemporalKind, Vec<IndexEntry>)>) -> Vec<EntityId> {
    type HeapKey = Reverse<(usize, OrderKey, EntityId, usize)>;

    let mut iters: Vec<std::vec::IntoIter<IndexEntry>> = Vec::with_capacity(streams.len());
    let mut heap: BinaryHeap<HeapKey> = BinaryHeap::new();

    for (kind, entries) in streams {
        let seq = iters.len();
        let mut iter = entries.into_iter();
        if let Some(entry) = iter.next() {
            heap.push(Reverse((kind.ordinal(), entry.key, entry.entity, seq)));
        }
        iters.push(iter);
    }

    let mut out = Vec::new();
    while let Some(Reverse((ordinal, _, entity, seq))) = heap.pop() {
        out.push(entity);
        if let Some(entry) = iters[seq].next() {
            heap.push(Reverse((ordinal, entry.key, entry.entity, seq)));
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PartRegistry;
    use crate::testing::MemoryPartFactory;
    use chronidx_core::{IndexError, IndexUpdate, IndexUpdater, TemporalValue, UpdateMode};
    use std::ops::Bound;
    use std::sync::Arc;

    fn date(days: i64) -> TemporalValue {
        TemporalValue::Date { epoch_days: days }
    }

    fn duration(seconds: i64) -> TemporalValue {
        TemporalValue::duration(0, 0, seconds, 0)
    }

    fn populated_reader(unique: bool) -> CompositeIndexReader {
        let registry = Arc::new(PartRegistry::new(Box::new(MemoryPartFactory::new())));
        let mut updater =
            crate::updater::CompositeIndexUpdater::new(Arc::clone(&registry), UpdateMode::Online);
        updater.apply(IndexUpdate::added(EntityId(1), date(10))).unwrap();
        updater.apply(IndexUpdate::added(EntityId(2), date(20))).unwrap();
        updater
            .apply(IndexUpdate::added(EntityId(3), duration(30)))
            .unwrap();
        updater.close().unwrap();
        CompositeIndexReader::new(registry.snapshot(), unique)
    }

    #[test]
    fn test_exact_match_routes_to_one_part() {
        let reader = populated_reader(false);
        let hits = reader
            .query(&ValuePredicate::exact(date(10)), ResultOrdering::Unordered)
            .unwrap();
        assert_eq!(hits, vec![EntityId(1)]);
    }

    #[test]
    fn test_exact_match_on_absent_part_is_empty() {
        let reader = populated_reader(false);
        let hits = reader
            .query(
                &ValuePredicate::exact(TemporalValue::LocalTime { nanos_of_day: 1 }),
                ResultOrdering::Unordered,
            )
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_range_routes_to_one_part() {
        let reader = populated_reader(false);
        let hits = reader
            .query(
                &ValuePredicate::range(
                    TemporalKind::Date,
                    Bound::Included(date(10)),
                    Bound::Included(date(15)),
                ),
                ResultOrdering::ByValue,
            )
            .unwrap();
        assert_eq!(hits, vec![EntityId(1)]);
    }

    #[test]
    fn test_range_with_mixed_kind_bound_fails() {
        let reader = populated_reader(false);
        let err = reader
            .query(
                &ValuePredicate::range(
                    TemporalKind::Date,
                    Bound::Included(duration(1)),
                    Bound::Unbounded,
                ),
                ResultOrdering::Unordered,
            )
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidPredicate(_)));
    }

    #[test]
    fn test_exists_concatenates_in_kind_order() {
        let reader = populated_reader(false);
        let hits = reader
            .query(&ValuePredicate::exists(), ResultOrdering::Unordered)
            .unwrap();
        // Date part first (entities 1, 2), then Duration (entity 3)
        assert_eq!(hits, vec![EntityId(1), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn test_exists_by_value_merges_streams() {
        let reader = populated_reader(false);
        let hits = reader
            .query(&ValuePredicate::exists(), ResultOrdering::ByValue)
            .unwrap();
        assert_eq!(hits, vec![EntityId(1), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn test_unique_exact_match_returns_single_hit() {
        let reader = populated_reader(true);
        let hits = reader
            .query(&ValuePredicate::exact(date(20)), ResultOrdering::Unordered)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_merge_by_value_interleaves_within_kind() {
        // Two streams of the same kind must interleave by key
        let a = vec![
            IndexEntry::new(date(1).order_key(), EntityId(1)),
            IndexEntry::new(date(5).order_key(), EntityId(5)),
        ];
        let b = vec![
            IndexEntry::new(date(2).order_key(), EntityId(2)),
            IndexEntry::new(date(9).order_key(), EntityId(9)),
        ];
        let merged = merge_by_value(vec![(TemporalKind::Date, a), (TemporalKind::Date, b)]);
        assert_eq!(
            merged,
            vec![EntityId(1), EntityId(2), EntityId(5), EntityId(9)]
        );
    }

    #[test]
    fn test_merge_by_value_orders_kinds_by_precedence() {
        let dates = vec![IndexEntry::new(date(1).order_key(), EntityId(1))];
        let durations = vec![IndexEntry::new(duration(1).order_key(), EntityId(2))];
        // Streams given out of kind order still come back in kind order
        let merged = merge_by_value(vec![
            (TemporalKind::Duration, durations),
            (TemporalKind::Date, dates),
        ]);
        assert_eq!(merged, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn test_reader_snapshot_misses_later_parts() {
        let registry = Arc::new(PartRegistry::new(Box::new(MemoryPartFactory::new())));
        let mut updater =
            crate::updater::CompositeIndexUpdater::new(Arc::clone(&registry), UpdateMode::Online);
        updater.apply(IndexUpdate::added(EntityId(1), date(1))).unwrap();
        updater.close().unwrap();

        let reader = CompositeIndexReader::new(registry.snapshot(), false);

        // A part materialized after the reader's snapshot is not visible
        let mut late =
            crate::updater::CompositeIndexUpdater::new(Arc::clone(&registry), UpdateMode::Online);
        late.apply(IndexUpdate::added(EntityId(2), duration(2))).unwrap();
        late.close().unwrap();

        let hits = reader
            .query(&ValuePredicate::exists(), ResultOrdering::Unordered)
            .unwrap();
        assert_eq!(hits, vec![EntityId(1)]);
    }
}
