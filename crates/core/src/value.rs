//! Temporal values and their index representation
//!
//! [`TemporalValue`] is the closed tagged union over the six temporal kinds.
//! Each variant carries normalized scalar fields (epoch days, epoch seconds,
//! nanos of day, offset seconds, duration components) so that values coming
//! from different producers compare identically.
//!
//! [`IndexValue`] is what the surrounding engine hands to the index: either
//! a supported temporal value or `Unsupported`, which this index silently
//! ignores — non-temporal values are some other index's responsibility.
//!
//! # Ordering
//!
//! Values do not implement `Ord` directly; ordering is defined per kind by
//! [`TemporalValue::order_key`]. Zoned values order by their UTC instant
//! first and by offset second, and durations order by their average length
//! (a month counts as 30.4375 days).

use crate::key::OrderKey;
use crate::kind::TemporalKind;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike};
use serde::{Deserialize, Serialize};

/// Average seconds per month (30.4375 days), used to order durations
const AVG_SECONDS_PER_MONTH: i64 = 2_629_800;

/// Seconds per day
const SECONDS_PER_DAY: i64 = 86_400;

/// Nanoseconds per second
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A value of one of the six temporal kinds, in normalized scalar form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalValue {
    /// Calendar date as days since 1970-01-01
    Date {
        /// Days since the Unix epoch (negative before 1970)
        epoch_days: i64,
    },

    /// Local date and time, no offset
    LocalDateTime {
        /// Seconds since the Unix epoch, interpreted without a zone
        epoch_seconds: i64,
        /// Sub-second nanoseconds, `0..1_000_000_000`
        nanos: u32,
    },

    /// Date and time anchored to a fixed UTC offset
    ZonedDateTime {
        /// Seconds since the Unix epoch of the UTC instant
        epoch_seconds: i64,
        /// Sub-second nanoseconds, `0..1_000_000_000`
        nanos: u32,
        /// Offset from UTC in seconds
        offset_seconds: i32,
    },

    /// Time of day, no offset
    LocalTime {
        /// Nanoseconds since midnight
        nanos_of_day: i64,
    },

    /// Time of day anchored to a fixed UTC offset
    ZonedTime {
        /// Nanoseconds since local midnight
        nanos_of_day: i64,
        /// Offset from UTC in seconds
        offset_seconds: i32,
    },

    /// An amount of time
    Duration {
        /// Whole months
        months: i64,
        /// Whole days
        days: i64,
        /// Seconds
        seconds: i64,
        /// Sub-second nanoseconds, normalized to `0..1_000_000_000`
        nanos: u32,
    },
}

impl TemporalValue {
    /// Build from a calendar date
    pub fn date(d: NaiveDate) -> Self {
        let epoch_days = d.signed_duration_since(NaiveDate::default()).num_days();
        TemporalValue::Date { epoch_days }
    }

    /// Build from a local date-time
    pub fn local_datetime(dt: NaiveDateTime) -> Self {
        let utc = dt.and_utc();
        TemporalValue::LocalDateTime {
            epoch_seconds: utc.timestamp(),
            nanos: utc.timestamp_subsec_nanos(),
        }
    }

    /// Build from an offset-anchored date-time
    pub fn zoned_datetime(dt: DateTime<FixedOffset>) -> Self {
        TemporalValue::ZonedDateTime {
            epoch_seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
            offset_seconds: dt.offset().fix().local_minus_utc(),
        }
    }

    /// Build from a local time of day
    pub fn local_time(t: NaiveTime) -> Self {
        TemporalValue::LocalTime {
            nanos_of_day: nanos_of_day(t),
        }
    }

    /// Build from an offset-anchored time of day
    pub fn zoned_time(t: NaiveTime, offset: FixedOffset) -> Self {
        TemporalValue::ZonedTime {
            nanos_of_day: nanos_of_day(t),
            offset_seconds: offset.local_minus_utc(),
        }
    }

    /// Build a duration from components, normalizing nanos into `0..1e9`
    pub fn duration(months: i64, days: i64, seconds: i64, nanos: i64) -> Self {
        let carry = nanos.div_euclid(NANOS_PER_SECOND);
        let nanos = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
        TemporalValue::Duration {
            months,
            days,
            seconds: seconds + carry,
            nanos,
        }
    }

    /// Build a pure-time duration from a `chrono` duration
    pub fn duration_of(d: chrono::Duration) -> Self {
        Self::duration(0, 0, d.num_seconds(), i64::from(d.subsec_nanos()))
    }

    /// The kind this value belongs to
    pub const fn kind(&self) -> TemporalKind {
        match self {
            TemporalValue::Date { .. } => TemporalKind::Date,
            TemporalValue::LocalDateTime { .. } => TemporalKind::LocalDateTime,
            TemporalValue::ZonedDateTime { .. } => TemporalKind::ZonedDateTime,
            TemporalValue::LocalTime { .. } => TemporalKind::LocalTime,
            TemporalValue::ZonedTime { .. } => TemporalKind::ZonedTime,
            TemporalValue::Duration { .. } => TemporalKind::Duration,
        }
    }

    /// The order-preserving part key for this value.
    ///
    /// Within one kind, key byte order equals semantic value order.
    pub fn order_key(&self) -> OrderKey {
        match *self {
            TemporalValue::Date { epoch_days } => {
                let mut k = OrderKey::with_capacity(8);
                k.push_i64(epoch_days);
                k
            }
            TemporalValue::LocalDateTime {
                epoch_seconds,
                nanos,
            } => {
                let mut k = OrderKey::with_capacity(12);
                k.push_i64(epoch_seconds);
                k.push_u32(nanos);
                k
            }
            TemporalValue::ZonedDateTime {
                epoch_seconds,
                nanos,
                offset_seconds,
            } => {
                // Instant order first; offset only breaks ties
                let mut k = OrderKey::with_capacity(16);
                k.push_i64(epoch_seconds);
                k.push_u32(nanos);
                k.push_i32(offset_seconds);
                k
            }
            TemporalValue::LocalTime { nanos_of_day } => {
                let mut k = OrderKey::with_capacity(8);
                k.push_i64(nanos_of_day);
                k
            }
            TemporalValue::ZonedTime {
                nanos_of_day,
                offset_seconds,
            } => {
                // UTC-adjusted nano of day first; offset breaks ties
                let utc_nanos =
                    nanos_of_day - i64::from(offset_seconds).saturating_mul(NANOS_PER_SECOND);
                let mut k = OrderKey::with_capacity(12);
                k.push_i64(utc_nanos);
                k.push_i32(offset_seconds);
                k
            }
            TemporalValue::Duration {
                months,
                days,
                seconds,
                nanos,
            } => {
                // Average length dominates; components break ties so that
                // distinct durations of equal average length stay distinct
                let avg_seconds = months
                    .saturating_mul(AVG_SECONDS_PER_MONTH)
                    .saturating_add(days.saturating_mul(SECONDS_PER_DAY))
                    .saturating_add(seconds);
                let mut k = OrderKey::with_capacity(28);
                k.push_i64(avg_seconds);
                k.push_u32(nanos);
                k.push_i64(months);
                k.push_i64(days);
                k
            }
        }
    }
}

fn nanos_of_day(t: NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(t.nanosecond())
}

/// A value as handed to the index by the surrounding engine.
///
/// Values outside the six temporal kinds arrive as `Unsupported` and are
/// silently excluded from this index — that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexValue {
    /// A value this index partitions and stores
    Temporal(TemporalValue),
    /// A value outside the six kinds; ignored by this index
    Unsupported,
}

impl IndexValue {
    /// The supported temporal value, if any
    pub fn temporal(&self) -> Option<&TemporalValue> {
        match self {
            IndexValue::Temporal(v) => Some(v),
            IndexValue::Unsupported => None,
        }
    }

    /// The partition kind, or `None` for unsupported values
    pub fn kind(&self) -> Option<TemporalKind> {
        self.temporal().map(TemporalValue::kind)
    }
}

impl From<TemporalValue> for IndexValue {
    fn from(v: TemporalValue) -> Self {
        IndexValue::Temporal(v)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_date_from_chrono() {
        let epoch = TemporalValue::date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(epoch, TemporalValue::Date { epoch_days: 0 });

        let next = TemporalValue::date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
        assert_eq!(next, TemporalValue::Date { epoch_days: 1 });

        let before = TemporalValue::date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap());
        assert_eq!(before, TemporalValue::Date { epoch_days: -1 });
    }

    #[test]
    fn test_local_datetime_from_chrono() {
        let dt = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_nano_opt(0, 0, 1, 500)
            .unwrap();
        let v = TemporalValue::local_datetime(dt);
        assert_eq!(
            v,
            TemporalValue::LocalDateTime {
                epoch_seconds: 1,
                nanos: 500
            }
        );
    }

    #[test]
    fn test_zoned_datetime_orders_by_instant() {
        // 12:00+02:00 is 10:00 UTC, earlier than 11:00+00:00
        let a: DateTime<FixedOffset> = "2024-03-01T12:00:00+02:00".parse().unwrap();
        let b: DateTime<FixedOffset> = "2024-03-01T11:00:00+00:00".parse().unwrap();
        let ka = TemporalValue::zoned_datetime(a).order_key();
        let kb = TemporalValue::zoned_datetime(b).order_key();
        assert!(ka < kb);
    }

    #[test]
    fn test_zoned_time_orders_by_utc_adjusted_time() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let eleven = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        // 12:00+02:00 == 10:00 UTC, so it sorts before 11:00+00:00
        let a = TemporalValue::zoned_time(noon, east).order_key();
        let b = TemporalValue::zoned_time(eleven, utc).order_key();
        assert!(a < b);
    }

    #[test]
    fn test_duration_month_vs_days_ordering() {
        // 30 days < 1 month (30.4375 days) < 31 days
        let thirty = TemporalValue::duration(0, 30, 0, 0).order_key();
        let month = TemporalValue::duration(1, 0, 0, 0).order_key();
        let thirty_one = TemporalValue::duration(0, 31, 0, 0).order_key();
        assert!(thirty < month);
        assert!(month < thirty_one);
    }

    #[test]
    fn test_duration_nanos_normalized() {
        let v = TemporalValue::duration(0, 0, 1, 2_500_000_000);
        assert_eq!(
            v,
            TemporalValue::Duration {
                months: 0,
                days: 0,
                seconds: 3,
                nanos: 500_000_000
            }
        );

        let neg = TemporalValue::duration(0, 0, 0, -1);
        assert_eq!(
            neg,
            TemporalValue::Duration {
                months: 0,
                days: 0,
                seconds: -1,
                nanos: 999_999_999
            }
        );
    }

    #[test]
    fn test_duration_of_chrono() {
        let v = TemporalValue::duration_of(chrono::Duration::milliseconds(1_500));
        assert_eq!(
            v,
            TemporalValue::Duration {
                months: 0,
                days: 0,
                seconds: 1,
                nanos: 500_000_000
            }
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            TemporalValue::Date { epoch_days: 0 }.kind(),
            TemporalKind::Date
        );
        assert_eq!(
            TemporalValue::duration(1, 0, 0, 0).kind(),
            TemporalKind::Duration
        );
        assert_eq!(
            TemporalValue::LocalTime { nanos_of_day: 0 }.kind(),
            TemporalKind::LocalTime
        );
    }

    #[test]
    fn test_index_value_unsupported() {
        let v = IndexValue::Unsupported;
        assert_eq!(v.kind(), None);
        assert!(v.temporal().is_none());

        let t: IndexValue = TemporalValue::Date { epoch_days: 3 }.into();
        assert_eq!(t.kind(), Some(TemporalKind::Date));
    }

    #[test]
    fn test_value_serde_roundtrip() {
        let values = [
            TemporalValue::Date { epoch_days: -40 },
            TemporalValue::LocalDateTime {
                epoch_seconds: 12,
                nanos: 34,
            },
            TemporalValue::ZonedDateTime {
                epoch_seconds: 56,
                nanos: 78,
                offset_seconds: 3600,
            },
            TemporalValue::duration(1, 2, 3, 4),
        ];
        for v in values {
            let bytes = bincode::serialize(&v).unwrap();
            let restored: TemporalValue = bincode::deserialize(&bytes).unwrap();
            assert_eq!(v, restored);
        }
    }

    // ------------------------------------------------------------------
    // Order-preservation properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_date_key_preserves_order(a in -3_000_000i64..3_000_000, b in -3_000_000i64..3_000_000) {
            let ka = TemporalValue::Date { epoch_days: a }.order_key();
            let kb = TemporalValue::Date { epoch_days: b }.order_key();
            prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        }

        #[test]
        fn prop_local_datetime_key_preserves_order(
            sa in -1_000_000_000i64..1_000_000_000,
            na in 0u32..1_000_000_000,
            sb in -1_000_000_000i64..1_000_000_000,
            nb in 0u32..1_000_000_000,
        ) {
            let ka = TemporalValue::LocalDateTime { epoch_seconds: sa, nanos: na }.order_key();
            let kb = TemporalValue::LocalDateTime { epoch_seconds: sb, nanos: nb }.order_key();
            prop_assert_eq!(ka.cmp(&kb), (sa, na).cmp(&(sb, nb)));
        }

        #[test]
        fn prop_duration_key_preserves_average_length_order(
            ma in -10_000i64..10_000,
            da in -100_000i64..100_000,
            sa in -10_000_000i64..10_000_000,
            mb in -10_000i64..10_000,
            db in -100_000i64..100_000,
            sb in -10_000_000i64..10_000_000,
        ) {
            let avg_a = ma * super::AVG_SECONDS_PER_MONTH + da * super::SECONDS_PER_DAY + sa;
            let avg_b = mb * super::AVG_SECONDS_PER_MONTH + db * super::SECONDS_PER_DAY + sb;
            let ka = TemporalValue::duration(ma, da, sa, 0).order_key();
            let kb = TemporalValue::duration(mb, db, sb, 0).order_key();
            if avg_a != avg_b {
                prop_assert_eq!(ka.cmp(&kb), avg_a.cmp(&avg_b));
            }
        }

        #[test]
        fn prop_zoned_time_key_preserves_utc_order(
            ta in 0i64..86_400_000_000_000i64,
            oa in -64_800i32..64_800,
            tb in 0i64..86_400_000_000_000i64,
            ob in -64_800i32..64_800,
        ) {
            let ua = ta - i64::from(oa) * 1_000_000_000;
            let ub = tb - i64::from(ob) * 1_000_000_000;
            let ka = TemporalValue::ZonedTime { nanos_of_day: ta, offset_seconds: oa }.order_key();
            let kb = TemporalValue::ZonedTime { nanos_of_day: tb, offset_seconds: ob }.order_key();
            if ua != ub {
                prop_assert_eq!(ka.cmp(&kb), ua.cmp(&ub));
            }
        }
    }
}
