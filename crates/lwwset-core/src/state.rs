//! Key → timestamp map underlying the set.
//!
//! Keys are arbitrary byte strings and order bytewise.
//!
//! `LWWState` is plain data: it has no lock and no clock. The synchronized
//! [`LWWSet`](crate::set::LWWSet) owns one and also hands out copies of it as
//! snapshots and deltas.

use crate::entry::LWWTime;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered mapping from key to its [`LWWTime`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LWWState {
    entries: BTreeMap<Vec<u8>, LWWTime>,
}

impl LWWState {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<LWWTime> {
        self.entries.get(key.as_ref()).copied()
    }

    /// Overwrite the entry for `key`, returning the previous one.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, time: LWWTime) -> Option<LWWTime> {
        self.entries.insert(key.into(), time)
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.get(key.as_ref()).is_some_and(LWWTime::is_added)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, ascending by key.
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, LWWTime> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(Vec::as_slice)
    }

    /// Stamp `key` as added at `time`, creating the entry if needed.
    pub(crate) fn add_at(&mut self, key: &[u8], time: i64) {
        self.entry_mut(key).add_time = time;
    }

    /// Stamp `key` as removed at `time`, creating a tombstone if needed.
    pub(crate) fn remove_at(&mut self, key: &[u8], time: i64) {
        self.entry_mut(key).del_time = time;
    }

    fn entry_mut(&mut self, key: &[u8]) -> &mut LWWTime {
        self.entries.entry(key.to_vec()).or_default()
    }

    /// Join `incoming` into `self` and return the part of it that was new.
    ///
    /// The returned state holds exactly the incoming entries whose join moved
    /// the local entry forward, with their incoming timestamps. Entries that
    /// added nothing are left out, so the result is what still needs to be
    /// forwarded to other replicas.
    ///
    /// Afterwards `self` equals the [`Lattice::join`] of both states: a zero
    /// entry for an unseen key is stored but is not part of the delta.
    pub fn merge_delta(&mut self, incoming: &LWWState) -> LWWState {
        let mut delta = LWWState::new();
        for (key, theirs) in &incoming.entries {
            match self.entries.get_mut(key) {
                Some(ours) => {
                    let joined = ours.join(theirs);
                    if joined == *ours {
                        continue;
                    }
                    *ours = joined;
                }
                None => {
                    self.entries.insert(key.clone(), *theirs);
                    if theirs.is_zero() {
                        continue;
                    }
                }
            }
            delta.entries.insert(key.clone(), *theirs);
        }
        delta
    }

    /// Live keys in ascending order, optionally restricted to a byte prefix.
    pub fn range_live<'a>(&'a self, prefix: Option<&'a [u8]>) -> impl Iterator<Item = &'a [u8]> + 'a {
        let prefix = prefix.unwrap_or_default();

        self.entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .filter(|(_, time)| time.is_added())
            .map(|(key, _)| key.as_slice())
    }

    /// Drop tombstones whose remove is older than `now - cutoff`.
    ///
    /// Live entries are never touched. Returns how many entries were dropped.
    pub fn prune_tombstones(&mut self, now: i64, cutoff: i64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, time| !(time.is_removed() && time.del_time.saturating_add(cutoff) < now));
        before - self.entries.len()
    }
}

impl Lattice for LWWState {
    fn bottom() -> Self {
        Self::new()
    }

    fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge_delta(other);
        result
    }

    fn join_assign(&mut self, other: &Self) {
        self.merge_delta(other);
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, LWWTime)> for LWWState {
    fn from_iter<I: IntoIterator<Item = (K, LWWTime)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<BTreeMap<Vec<u8>, LWWTime>> for LWWState {
    fn from(entries: BTreeMap<Vec<u8>, LWWTime>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a LWWState {
    type Item = (&'a Vec<u8>, &'a LWWTime);
    type IntoIter = btree_map::Iter<'a, Vec<u8>, LWWTime>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
