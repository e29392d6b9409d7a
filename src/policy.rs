//! Policy bundles: how a table hashes, compares, copies and releases entries.

use crate::error::AllocError;
use crate::hash::djb2;
use core::hash::{BuildHasher, Hash};

/// The six callbacks a table routes every entry through.
///
/// `Key` and `Value` are the borrowed forms callers hand in; the table stores
/// the owned `K`/`V` produced by `copy_key`/`copy_value` and reads them back
/// through `Borrow`. A table never aliases caller memory: every stored entry
/// is a copy made by the policy.
///
/// `hash` and `equals` must agree: keys that compare equal must hash equal.
/// A table fixes its policy at construction, so entries are always released
/// by the same policy that copied them.
pub trait Policy<K, V> {
    type Key: ?Sized;
    type Value: ?Sized;

    fn hash(&self, key: &Self::Key) -> u64;

    fn equals(&self, a: &Self::Key, b: &Self::Key) -> bool;

    fn copy_key(&self, key: &Self::Key) -> Result<K, AllocError>;

    fn copy_value(&self, value: &Self::Value) -> Result<V, AllocError>;

    /// Called exactly once for every key the table let go of.
    fn destroy_key(&self, key: K) {
        drop(key);
    }

    /// Called exactly once for every value the table let go of.
    fn destroy_value(&self, value: V) {
        drop(value);
    }
}

/// Byte-oriented defaults: djb2 over the key bytes, byte-wise equality,
/// `Clone` for copies and plain drops for release.
///
/// djb2 stops at the first NUL byte, so keys that embed zero bytes and differ
/// only after them share a hash. They still compare unequal; binary keys with
/// many such collisions are better served by [`HasherPolicy`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultPolicy;

impl<K, V> Policy<K, V> for DefaultPolicy
where
    K: AsRef<[u8]> + Clone,
    V: Clone,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn hash(&self, key: &K) -> u64 {
        djb2(key.as_ref())
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }

    fn copy_key(&self, key: &K) -> Result<K, AllocError> {
        Ok(key.clone())
    }

    fn copy_value(&self, value: &V) -> Result<V, AllocError> {
        Ok(value.clone())
    }
}

/// Adapts a `BuildHasher` and `K: Eq` to the policy interface, for keys that
/// are not byte strings.
#[derive(Clone, Debug, Default)]
pub struct HasherPolicy<S = hashbrown::hash_map::DefaultHashBuilder> {
    hasher: S,
}

impl<S> HasherPolicy<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, V, S> Policy<K, V> for HasherPolicy<S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }

    fn copy_key(&self, key: &K) -> Result<K, AllocError> {
        Ok(key.clone())
    }

    fn copy_value(&self, value: &V) -> Result<V, AllocError> {
        Ok(value.clone())
    }
}
