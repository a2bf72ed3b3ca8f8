//! Query predicates
//!
//! A predicate either binds a single kind (exact match, range) or asks for
//! everything (existence). Kind-bound predicates are routed to one part;
//! existence fans out to every live part.

use crate::error::{IndexError, Result};
use crate::key::OrderKey;
use crate::kind::TemporalKind;
use crate::value::TemporalValue;
use std::ops::Bound;

/// What a query asks of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePredicate {
    /// Entities indexed under exactly this value
    Exact(TemporalValue),
    /// Entities whose value of `kind` falls in the bound range.
    /// Bound values must themselves be of `kind`.
    Range {
        /// The single kind this range is bound to
        kind: TemporalKind,
        /// Lower bound
        lower: Bound<TemporalValue>,
        /// Upper bound
        upper: Bound<TemporalValue>,
    },
    /// Every indexed entity, regardless of kind
    Exists,
}

impl ValuePredicate {
    /// Exact-match predicate
    pub fn exact(value: TemporalValue) -> Self {
        ValuePredicate::Exact(value)
    }

    /// Range predicate over one kind
    pub fn range(kind: TemporalKind, lower: Bound<TemporalValue>, upper: Bound<TemporalValue>) -> Self {
        ValuePredicate::Range { kind, lower, upper }
    }

    /// Existence predicate
    pub fn exists() -> Self {
        ValuePredicate::Exists
    }

    /// The single kind this predicate is bound to, or `None` for existence
    pub fn kind(&self) -> Option<TemporalKind> {
        match self {
            ValuePredicate::Exact(v) => Some(v.kind()),
            ValuePredicate::Range { kind, .. } => Some(*kind),
            ValuePredicate::Exists => None,
        }
    }

    /// Lower this predicate to the key domain a part understands.
    ///
    /// Fails with `InvalidPredicate` when a range bound's value is not of
    /// the range's kind.
    pub fn key_probe(&self) -> Result<KeyProbe> {
        match self {
            ValuePredicate::Exact(v) => Ok(KeyProbe::Exact(v.order_key())),
            ValuePredicate::Range { kind, lower, upper } => Ok(KeyProbe::Range {
                lower: bound_key(*kind, lower)?,
                upper: bound_key(*kind, upper)?,
            }),
            ValuePredicate::Exists => Ok(KeyProbe::All),
        }
    }
}

fn bound_key(kind: TemporalKind, bound: &Bound<TemporalValue>) -> Result<Bound<OrderKey>> {
    let check = |v: &TemporalValue| -> Result<OrderKey> {
        if v.kind() != kind {
            return Err(IndexError::InvalidPredicate(format!(
                "range over {kind} has a bound of kind {}",
                v.kind()
            )));
        }
        Ok(v.order_key())
    };
    Ok(match bound {
        Bound::Included(v) => Bound::Included(check(v)?),
        Bound::Excluded(v) => Bound::Excluded(check(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

/// Whether query results must come back globally value-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrdering {
    /// Any order; cross-part results are concatenated in kind order
    Unordered,
    /// Value order: kind precedence first, then in-kind value order
    ByValue,
}

/// A predicate lowered to the order-key domain of a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyProbe {
    /// Entries under exactly this key
    Exact(OrderKey),
    /// Entries in the key range
    Range {
        /// Lower bound
        lower: Bound<OrderKey>,
        /// Upper bound
        upper: Bound<OrderKey>,
    },
    /// Every entry in the part
    All,
}
