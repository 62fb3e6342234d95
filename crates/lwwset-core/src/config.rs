//! Tunables for a set.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default tombstone retention: two minutes, in [`SystemClock`](crate::clock::SystemClock) nanoseconds.
pub const DEFAULT_GC_CUTOFF: i64 = 2 * 60 * 1_000_000_000;

/// Policy for reclaiming tombstones.
///
/// `cutoff` is measured in the units of the set's clock and must be larger
/// than the longest time a remove can take to reach every replica. A
/// tombstone dropped earlier than that can let a late, older add come back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcPolicy {
    /// How long a tombstone is kept after its remove.
    pub cutoff: i64,
}

impl Default for GcPolicy {
    fn default() -> Self {
        GcPolicy {
            cutoff: DEFAULT_GC_CUTOFF,
        }
    }
}

impl GcPolicy {
    pub fn new(cutoff: i64) -> Self {
        GcPolicy { cutoff }
    }

    /// Policy for a nanosecond clock, such as `SystemClock`.
    pub fn from_duration(cutoff: Duration) -> Self {
        GcPolicy {
            cutoff: i64::try_from(cutoff.as_nanos()).unwrap_or(i64::MAX),
        }
    }
}
