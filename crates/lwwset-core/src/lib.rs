//! # lwwset-core
//!
//! Last-Writer-Wins element set (LWW-Set), a state-based CRDT for replicated
//! sets of byte-string keys such as subscriptions or presence entries.
//!
//! This crate provides:
//! - [`LWWTime`]: per-key add/remove timestamps and their predicates
//! - [`LWWState`]: the ordered key map with a delta-producing merge
//! - [`LWWSet`]: the lock-guarded set used by writers and the replication layer
//! - A compact snappy-framed binary codec for gossip and snapshots
//! - Cutoff-based tombstone collection ([`GcPolicy`])
//!
//! ## Example
//!
//! ```rust
//! use lwwset_core::{LWWSet, ManualClock};
//! use std::sync::Arc;
//!
//! let clock = ManualClock::new(1);
//! let local = LWWSet::with_clock(Arc::new(clock.clone()));
//! let remote = LWWSet::with_clock(Arc::new(clock.clone()));
//!
//! local.add("room/1");
//! clock.advance(1);
//! remote.remove("room/1");
//!
//! // Ship the remote state and keep only what changed the local replica.
//! let bytes = remote.marshal().unwrap();
//! let incoming = lwwset_core::LWWState::decode(&bytes).unwrap();
//! let delta = local.merge(&incoming);
//!
//! assert!(!local.contains("room/1"));
//! assert_eq!(delta.len(), 1);
//! ```

pub mod clock;
mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod lattice;
pub mod set;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GcPolicy, DEFAULT_GC_CUTOFF};
pub use entry::LWWTime;
pub use error::{CodecError, Result};
pub use lattice::Lattice;
pub use set::LWWSet;
pub use state::LWWState;
