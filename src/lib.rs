//! chained-map: a separate-chaining hash table whose hashing, comparison,
//! copying and release of entries are supplied by a pluggable policy.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table engine, two faces. A typed map for Rust callers and a
//!   byte-buffer map with runtime sizes and swappable function pointers.
//! - Layers:
//!   - BucketArray<K, V>: chain heads over an arena of nodes. Nodes link to
//!     each other by arena key, so a resize only rewrites links.
//!   - ChainedMap<K, V, P>: policy-driven add/get/remove plus the
//!     load-factor resize rules.
//!   - ByteMap: fixed key/value byte sizes chosen at construction over a
//!     `ChainedMap<Box<[u8]>, Box<[u8]>, BytePolicy>`.
//!
//! Semantics
//! - `add` never overwrites: adding a present key returns the stored value
//!   and discards the new one. Remove first to replace.
//! - Every stored key and value is a copy made by the policy; callers keep
//!   ownership of what they pass in. Every stored copy is released through
//!   the policy exactly once, on remove or when the table drops.
//! - Growth (+50%) runs when an add would push `len / capacity` above the
//!   max threshold, before the new node is linked. Shrink (-50%) runs after a
//!   remove leaves the ratio below the min threshold. Capacity never drops
//!   below `MIN_CAPACITY`.
//! - A resize that cannot allocate is skipped; the triggering add/remove
//!   still succeeds and the table stays correct, just off its ideal load.
//! - A failed add leaves the table exactly as it was.
//!
//! Hash invariants
//! - Each node keeps the hash computed when it was added, and resizes relink
//!   by that stored hash. The policy's `hash` is not called during a resize.
//!
//! Constraints and non-goals
//! - Single-threaded: no internal locking. Wrap the table in a `Mutex` to
//!   share it.
//! - No iteration order, no persistence, no pointer stability across
//!   add/remove.
//! - Reentrancy: a policy callback must not call back into the table it is
//!   serving; debug builds panic if one does.

mod buckets;
pub mod byte_map;
pub mod bytes;
pub mod config;
mod error;
pub mod hash;
pub mod map;
mod map_proptest;
pub mod policy;
mod reentrancy;

// Public surface
pub use buckets::Iter;
pub use byte_map::{BytePolicy, ByteMap};
pub use config::{LoadFactor, MapConfig, DEFAULT_CAPACITY, MIN_CAPACITY};
pub use error::{AllocError, Error, Part};
pub use map::{ChainedMap, Inspect};
pub use policy::{DefaultPolicy, HasherPolicy, Policy};
