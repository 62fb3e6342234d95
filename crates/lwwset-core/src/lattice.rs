//! Merge law shared by [`LWWTime`](crate::entry::LWWTime) and
//! [`LWWState`](crate::state::LWWState).
//!
//! A single entry joins by taking the later add and the later remove; a whole
//! state joins key by key. Because that join is commutative, associative and
//! idempotent, gossip can deliver snapshots and deltas in any order, any
//! number of times, and every replica still settles on the same set.

use std::cmp::Ordering;

/// Replica state with a merge that never loses information.
pub trait Lattice: Clone + PartialEq {
    /// The state that knows nothing: an empty set, or a zero entry.
    fn bottom() -> Self;

    /// Combine two replicas' knowledge.
    fn join(&self, other: &Self) -> Self;

    /// How two states relate: `Less` when `other` already knows everything in
    /// `self`, `None` when each holds something the other lacks.
    fn partial_cmp_lattice(&self, other: &Self) -> Option<Ordering> {
        let joined = self.join(other);
        match (&joined == self, &joined == other) {
            (true, true) => Some(Ordering::Equal),
            (false, true) => Some(Ordering::Less),
            (true, false) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }

    /// `true` when merging `self` into `other` would change nothing.
    fn leq(&self, other: &Self) -> bool {
        matches!(
            self.partial_cmp_lattice(other),
            Some(Ordering::Less) | Some(Ordering::Equal)
        )
    }

    /// Merge `other` into `self` in place.
    fn join_assign(&mut self, other: &Self) {
        *self = self.join(other);
    }
}
