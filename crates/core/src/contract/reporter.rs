//! Consistency violation reporting
//!
//! Consistency problems are reported through a shared sink rather than
//! thrown: checking continues across every part so the sink accumulates
//! all violations, not just the first.

use crate::kind::TemporalKind;
use parking_lot::Mutex;

/// One consistency violation found in a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    /// The partition the violation was found in
    pub kind: TemporalKind,
    /// What is wrong
    pub detail: String,
}

impl ConsistencyViolation {
    /// Build a violation for a part
    pub fn new(kind: TemporalKind, detail: impl Into<String>) -> Self {
        ConsistencyViolation {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}

/// Sink shared by every part during a consistency check.
pub trait ConsistencyReporter: Send + Sync {
    /// Record one violation; must not abort the check
    fn report(&self, violation: ConsistencyViolation);
}

/// A reporter that accumulates every violation in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    violations: Mutex<Vec<ConsistencyViolation>>,
}

impl CollectingReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// All violations reported so far, in report order
    pub fn violations(&self) -> Vec<ConsistencyViolation> {
        self.violations.lock().clone()
    }

    /// Number of violations reported so far
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Whether nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }
}

impl ConsistencyReporter for CollectingReporter {
    fn report(&self, violation: ConsistencyViolation) {
        self.violations.lock().push(violation);
    }
}
