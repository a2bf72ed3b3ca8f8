//! Temporal kind enumeration
//!
//! The index is partitioned by runtime value kind. Every value the index
//! accepts falls into exactly one of the six temporal kinds, and each kind
//! is backed by its own single-kind ordered structure on disk.
//!
//! ## The Six Kinds
//!
//! | Kind | Example | Ordered by |
//! |------|---------|------------|
//! | Date | 2024-03-01 | epoch day |
//! | LocalDateTime | 2024-03-01T12:00 | epoch second, nano |
//! | ZonedDateTime | 2024-03-01T12:00+02:00 | instant, offset |
//! | LocalTime | 12:00:00 | nano of day |
//! | ZonedTime | 12:00:00+02:00 | UTC nano of day, offset |
//! | Duration | P1M2DT3H | average length |

use serde::{Deserialize, Serialize};

/// The six temporal partition kinds.
///
/// The declaration order is the canonical total order: part iteration,
/// close order, and cross-part result concatenation all follow it.
///
/// ## Invariant
///
/// This enum MUST have exactly 6 variants. `ALL` and the `kind_id`
/// mapping must stay in sync with any change here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    /// Calendar date without time of day
    Date,

    /// Date and time without a zone or offset
    LocalDateTime,

    /// Date and time anchored to a UTC offset
    ZonedDateTime,

    /// Time of day without a zone or offset
    LocalTime,

    /// Time of day anchored to a UTC offset
    ZonedTime,

    /// An amount of time (months, days, seconds, nanos)
    Duration,
}

impl TemporalKind {
    /// All kinds in canonical order (for iteration)
    pub const ALL: [TemporalKind; 6] = [
        TemporalKind::Date,
        TemporalKind::LocalDateTime,
        TemporalKind::ZonedDateTime,
        TemporalKind::LocalTime,
        TemporalKind::ZonedTime,
        TemporalKind::Duration,
    ];

    /// All kinds as a slice
    pub fn all() -> &'static [TemporalKind] {
        &Self::ALL
    }

    /// Position in the canonical order, 0..6
    pub const fn ordinal(&self) -> usize {
        match self {
            TemporalKind::Date => 0,
            TemporalKind::LocalDateTime => 1,
            TemporalKind::ZonedDateTime => 2,
            TemporalKind::LocalTime => 3,
            TemporalKind::ZonedTime => 4,
            TemporalKind::Duration => 5,
        }
    }

    /// Human-readable display name
    pub const fn name(&self) -> &'static str {
        match self {
            TemporalKind::Date => "Date",
            TemporalKind::LocalDateTime => "LocalDateTime",
            TemporalKind::ZonedDateTime => "ZonedDateTime",
            TemporalKind::LocalTime => "LocalTime",
            TemporalKind::ZonedTime => "ZonedTime",
            TemporalKind::Duration => "Duration",
        }
    }

    /// File stem used for the kind's on-disk part file
    pub const fn file_stem(&self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::LocalDateTime => "local-datetime",
            TemporalKind::ZonedDateTime => "zoned-datetime",
            TemporalKind::LocalTime => "local-time",
            TemporalKind::ZonedTime => "zoned-time",
            TemporalKind::Duration => "duration",
        }
    }

    /// Parse from a part file stem
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        match stem {
            "date" => Some(TemporalKind::Date),
            "local-datetime" => Some(TemporalKind::LocalDateTime),
            "zoned-datetime" => Some(TemporalKind::ZonedDateTime),
            "local-time" => Some(TemporalKind::LocalTime),
            "zoned-time" => Some(TemporalKind::ZonedTime),
            "duration" => Some(TemporalKind::Duration),
            _ => None,
        }
    }

    /// Stable on-disk identifier written into part file headers
    pub const fn kind_id(&self) -> u8 {
        match self {
            TemporalKind::Date => 1,
            TemporalKind::LocalDateTime => 2,
            TemporalKind::ZonedDateTime => 3,
            TemporalKind::LocalTime => 4,
            TemporalKind::ZonedTime => 5,
            TemporalKind::Duration => 6,
        }
    }

    /// Parse from the stable on-disk identifier
    pub fn from_kind_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(TemporalKind::Date),
            2 => Some(TemporalKind::LocalDateTime),
            3 => Some(TemporalKind::ZonedDateTime),
            4 => Some(TemporalKind::LocalTime),
            5 => Some(TemporalKind::ZonedTime),
            6 => Some(TemporalKind::Duration),
            _ => None,
        }
    }
}

impl std::fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================
