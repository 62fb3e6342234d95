//! Per-key timestamp pair of the Last-Writer-Wins element set.
//!
//! Every key carries the time it was last added and the time it was last
//! removed. Whichever is later decides membership; a tie goes to the remove.

use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};

/// Add and remove timestamps for a single key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LWWTime {
    /// Time of the most recent add.
    pub add_time: i64,
    /// Time of the most recent remove.
    pub del_time: i64,
}

impl LWWTime {
    pub const ZERO: LWWTime = LWWTime {
        add_time: 0,
        del_time: 0,
    };

    pub fn new(add_time: i64, del_time: i64) -> Self {
        Self { add_time, del_time }
    }

    /// The key is a live member of the set.
    pub fn is_added(&self) -> bool {
        self.add_time > self.del_time
    }

    /// The key is a tombstone.
    pub fn is_removed(&self) -> bool {
        self.del_time >= self.add_time && self.del_time > 0
    }

    /// Neither an add nor a remove has ever been recorded.
    pub fn is_zero(&self) -> bool {
        self.add_time == 0 && self.del_time == 0
    }
}

impl Lattice for LWWTime {
    fn bottom() -> Self {
        Self::ZERO
    }

    /// Component-wise max; neither timestamp can go backwards.
    fn join(&self, other: &Self) -> Self {
        Self {
            add_time: self.add_time.max(other.add_time),
            del_time: self.del_time.max(other.del_time),
        }
    }
}
