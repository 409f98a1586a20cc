//! Stats records emitted by work units
//!
//! A record describes the effect of one operation. Records from every worker
//! are funneled into a single sink in no particular order, so merging must be
//! commutative and associative with `Default` as the identity.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A mergeable bundle of counters
///
/// # Implementor notes
/// - `merge` must be **commutative** and **associative**; arrival order at the
///   aggregator is unspecified.
/// - `Self::default()` must be the identity of `merge`.
pub trait StatsRecord: Default + Send + 'static {
    /// Fold `other` into `self`
    fn merge(&mut self, other: Self);
}

/// Counters shared by the built-in workload families
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Documents inserted
    pub inserts: u64,
    /// Documents deleted
    pub deletes: u64,
    /// Documents updated
    pub updates: u64,
    /// Queries executed
    pub queries: u64,
    /// Generic operations (transactions, commands)
    pub operations: u64,
    /// Failed operations
    pub errors: u64,
}

impl Stats {
    /// A record for `n` inserts
    pub fn inserts(n: u64) -> Self {
        Self {
            inserts: n,
            ..Default::default()
        }
    }

    /// A record for `n` deletes
    pub fn deletes(n: u64) -> Self {
        Self {
            deletes: n,
            ..Default::default()
        }
    }

    /// A record for `n` updates
    pub fn updates(n: u64) -> Self {
        Self {
            updates: n,
            ..Default::default()
        }
    }

    /// A record for `n` queries
    pub fn queries(n: u64) -> Self {
        Self {
            queries: n,
            ..Default::default()
        }
    }

    /// A record for `n` generic operations
    pub fn operations(n: u64) -> Self {
        Self {
            operations: n,
            ..Default::default()
        }
    }

    /// A record for `n` failed operations
    pub fn errors(n: u64) -> Self {
        Self {
            errors: n,
            ..Default::default()
        }
    }

    /// Field-wise saturating difference, used for since-last-report deltas
    pub fn delta_since(&self, earlier: &Stats) -> Stats {
        Stats {
            inserts: self.inserts.saturating_sub(earlier.inserts),
            deletes: self.deletes.saturating_sub(earlier.deletes),
            updates: self.updates.saturating_sub(earlier.updates),
            queries: self.queries.saturating_sub(earlier.queries),
            operations: self.operations.saturating_sub(earlier.operations),
            errors: self.errors.saturating_sub(earlier.errors),
        }
    }

    /// Named counters in reporting order
    pub fn counters(&self) -> [(&'static str, u64); 6] {
        [
            ("inserts", self.inserts),
            ("deletes", self.deletes),
            ("updates", self.updates),
            ("queries", self.queries),
            ("operations", self.operations),
            ("errors", self.errors),
        ]
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.inserts += rhs.inserts;
        self.deletes += rhs.deletes;
        self.updates += rhs.updates;
        self.queries += rhs.queries;
        self.operations += rhs.operations;
        self.errors += rhs.errors;
    }
}

impl Add for Stats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl StatsRecord for Stats {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Stats> {
        vec![
            Stats::inserts(3),
            Stats::queries(1),
            Stats {
                updates: 2,
                errors: 1,
                ..Default::default()
            },
            Stats::operations(7),
            Stats::deletes(4),
            Stats {
                inserts: 1,
                operations: 1,
                ..Default::default()
            },
        ]
    }

    fn merge_all(records: impl IntoIterator<Item = Stats>) -> Stats {
        let mut acc = Stats::default();
        for r in records {
            acc.merge(r);
        }
        acc
    }

    #[test]
    fn test_default_is_identity() {
        let mut a = Stats::inserts(5);
        a.merge(Stats::default());
        assert_eq!(a, Stats::inserts(5));

        let mut zero = Stats::default();
        zero.merge(Stats::inserts(5));
        assert_eq!(zero, Stats::inserts(5));
    }

    #[test]
    fn test_merge_order_independent() {
        let records = sample_records();
        let forward = merge_all(records.iter().copied());
        let backward = merge_all(records.iter().rev().copied());

        // interleave evens then odds
        let interleaved = merge_all(
            records
                .iter()
                .step_by(2)
                .chain(records.iter().skip(1).step_by(2))
                .copied(),
        );

        assert_eq!(forward, backward);
        assert_eq!(forward, interleaved);
        assert_eq!(forward.inserts, 4);
        assert_eq!(forward.operations, 8);
        assert_eq!(forward.errors, 1);
    }

    #[test]
    fn test_merge_associative() {
        let [a, b, c] = [Stats::inserts(1), Stats::queries(2), Stats::errors(3)];
        assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn test_delta_since() {
        let earlier = Stats {
            inserts: 10,
            queries: 4,
            ..Default::default()
        };
        let now = Stats {
            inserts: 25,
            queries: 4,
            errors: 2,
            ..Default::default()
        };
        let delta = now.delta_since(&earlier);
        assert_eq!(delta.inserts, 15);
        assert_eq!(delta.queries, 0);
        assert_eq!(delta.errors, 2);
    }

    #[test]
    fn test_counters_order() {
        let names: Vec<_> = Stats::default().counters().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            ["inserts", "deletes", "updates", "queries", "operations", "errors"]
        );
    }

    #[test]
    fn test_stats_serialization() {
        let stats = Stats::operations(3);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"operations\":3"));
        let back: Stats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
