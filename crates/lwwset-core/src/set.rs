//! Last-Writer-Wins element set shared between local writers and replication.
//!
//! All operations take one lock over the whole map. A merge reads and writes
//! many keys and must be atomic against every other merge and mutation; none of
//! the critical sections block on I/O or on other locks.

use crate::clock::{Clock, SystemClock};
use crate::config::GcPolicy;
use crate::entry::LWWTime;
use crate::error::Result;
use crate::state::LWWState;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A replicated set of byte-string keys with last-writer-wins semantics.
///
/// Key arguments take anything viewable as bytes, so `&str` and `&[u8]` both work.
///
/// Each key keeps its last add and last remove time; a key is a member when
/// its add is strictly newer. Replicas converge by exchanging
/// [`LWWState`] deltas through [`LWWSet::merge`].
pub struct LWWSet {
    state: Mutex<LWWState>,
    clock: Arc<dyn Clock>,
    policy: GcPolicy,
}

impl LWWSet {
    /// Empty set on the system clock with the default GC policy.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, GcPolicy::default())
    }

    pub fn with_config(clock: Arc<dyn Clock>, policy: GcPolicy) -> Self {
        Self::from_parts(LWWState::new(), clock, policy)
    }

    /// Wrap an existing state, e.g. one received from a peer.
    pub fn from_state(state: LWWState, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(state, clock, GcPolicy::default())
    }

    /// Decode a set from bytes produced by [`LWWSet::marshal`].
    pub fn decode(bytes: &[u8], clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::from_state(LWWState::decode(bytes)?, clock))
    }

    fn from_parts(state: LWWState, clock: Arc<dyn Clock>, policy: GcPolicy) -> Self {
        LWWSet {
            state: Mutex::new(state),
            clock,
            policy,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn policy(&self) -> GcPolicy {
        self.policy
    }

    /// Record an add of `key` at the current time.
    ///
    /// Resurrects a removed key once the add is newer than its remove.
    pub fn add(&self, key: impl AsRef<[u8]>) {
        let now = self.clock.now();
        self.state.lock().add_at(key.as_ref(), now);
    }

    /// Record a remove of `key` at the current time.
    ///
    /// Leaves a tombstone even for keys this replica never saw added, so an
    /// older add arriving later stays removed.
    pub fn remove(&self, key: impl AsRef<[u8]>) {
        let now = self.clock.now();
        self.state.lock().remove_at(key.as_ref(), now);
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.state.lock().contains(key)
    }

    /// The timestamps recorded for `key`, live or not.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<LWWTime> {
        self.state.lock().get(key)
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LWWState {
        self.state.lock().clone()
    }

    /// Join `delta` into this set and return the entries that changed it.
    ///
    /// The returned state is the minimal delta to forward: it contains exactly
    /// the incoming entries whose timestamps moved this replica forward, so
    /// re-gossip traffic scales with what changed rather than with set size.
    pub fn merge(&self, delta: &LWWState) -> LWWState {
        let advanced = self.state.lock().merge_delta(delta);
        debug!(
            incoming = delta.len(),
            advanced = advanced.len(),
            "merged delta"
        );
        advanced
    }

    /// Merge another set's current state into this one.
    ///
    /// `other` is snapshotted before this set is locked, so two sets may merge
    /// into each other from different threads at the same time.
    pub fn merge_from(&self, other: &LWWSet) -> LWWState {
        let incoming = other.snapshot();
        self.merge(&incoming)
    }

    /// Drop tombstones older than the policy cutoff. Returns how many went.
    pub fn gc(&self) -> usize {
        let now = self.clock.now();
        let pruned = self.state.lock().prune_tombstones(now, self.policy.cutoff);
        debug!(pruned, now, cutoff = self.policy.cutoff, "collected tombstones");
        pruned
    }

    /// Encode the set for the wire or for storage.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        self.state.lock().encode()
    }

    /// Replace this set's state with the one encoded in `bytes`.
    ///
    /// The input is fully decoded before the lock is taken; on error the set
    /// is left untouched.
    pub fn unmarshal(&self, bytes: &[u8]) -> Result<()> {
        let decoded = LWWState::decode(bytes).inspect_err(|err| {
            warn!(error = %err, len = bytes.len(), "rejected encoded set");
        })?;
        debug!(entries = decoded.len(), "unmarshalled set");
        *self.state.lock() = decoded;
        Ok(())
    }

    /// Visit live keys in ascending order, optionally only those starting
    /// with `prefix`, until `visit` returns `false`.
    ///
    /// The lock is held for the whole walk, so `visit` sees one consistent
    /// state and must not call back into this set.
    pub fn range<F>(&self, prefix: Option<&[u8]>, mut visit: F)
    where
        F: FnMut(&[u8]) -> bool,
    {
        let state = self.state.lock();
        for key in state.range_live(prefix) {
            if !visit(key) {
                break;
            }
        }
    }
}

impl Default for LWWSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy of the state; the copy shares the clock and policy.
impl Clone for LWWSet {
    fn clone(&self) -> Self {
        Self::from_parts(self.snapshot(), Arc::clone(&self.clock), self.policy)
    }
}

/// Sets are equal when their states are; clocks and policies are ignored.
impl PartialEq for LWWSet {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.snapshot() == other.snapshot()
    }
}

impl Eq for LWWSet {}

impl fmt::Debug for LWWSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LWWSet")
            .field("state", &*self.state.lock())
            .field("clock", &self.clock)
            .field("policy", &self.policy)
            .finish()
    }
}
