//! ByteMap: type-erased table over fixed-size byte buffers.
//!
//! Key and value sizes are chosen at construction and never change. Inputs
//! shorter than the fixed size are zero-padded, so a short string can be used
//! as a key into a wider key slot; longer inputs are rejected. Behavior is
//! driven by a [`BytePolicy`] of plain function pointers that can be swapped
//! at runtime, except for the hash function, which is fixed for the table's
//! lifetime.

use crate::buckets::Iter;
use crate::bytes::{compare_bytes, copy_bytes, release};
use crate::config::{LoadFactor, MapConfig};
use crate::error::{AllocError, Error, Part};
use crate::hash::djb2;
use crate::map::ChainedMap;
use crate::policy::Policy;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

pub type HashFn = fn(&[u8]) -> u64;
pub type CompareFn = fn(&[u8], &[u8]) -> Ordering;
pub type CopyFn = fn(&[u8]) -> Result<Box<[u8]>, AllocError>;
pub type DestroyFn = fn(Box<[u8]>);
pub type PrintFn = fn(&[u8], &mut fmt::Formatter<'_>) -> fmt::Result;

/// Function-pointer policy for byte buffers.
#[derive(Copy, Clone, Debug)]
pub struct BytePolicy {
    pub hash: HashFn,
    pub compare: CompareFn,
    pub copy_key: CopyFn,
    pub copy_value: CopyFn,
    pub destroy_key: DestroyFn,
    pub destroy_value: DestroyFn,
}

impl BytePolicy {
    /// `hash` plus the defaults: whole-buffer compare, whole-buffer copy,
    /// plain release.
    pub fn new(hash: HashFn) -> Self {
        Self {
            hash,
            compare: compare_bytes,
            copy_key: copy_bytes,
            copy_value: copy_bytes,
            destroy_key: release,
            destroy_value: release,
        }
    }
}

impl Default for BytePolicy {
    fn default() -> Self {
        Self::new(djb2)
    }
}

impl Policy<Box<[u8]>, Box<[u8]>> for BytePolicy {
    type Key = [u8];
    type Value = [u8];

    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equals(&self, a: &[u8], b: &[u8]) -> bool {
        (self.compare)(a, b) == Ordering::Equal
    }

    fn copy_key(&self, key: &[u8]) -> Result<Box<[u8]>, AllocError> {
        (self.copy_key)(key)
    }

    fn copy_value(&self, value: &[u8]) -> Result<Box<[u8]>, AllocError> {
        (self.copy_value)(value)
    }

    fn destroy_key(&self, key: Box<[u8]>) {
        (self.destroy_key)(key)
    }

    fn destroy_value(&self, value: Box<[u8]>) {
        (self.destroy_value)(value)
    }
}

fn fit(part: Part, size: usize, bytes: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    match bytes.len().cmp(&size) {
        Ordering::Equal => Ok(Cow::Borrowed(bytes)),
        Ordering::Less => {
            let mut padded = bytes.to_vec();
            padded.resize(size, 0);
            Ok(Cow::Owned(padded))
        }
        Ordering::Greater => Err(Error::Oversized {
            part,
            expected: size,
            actual: bytes.len(),
        }),
    }
}

pub struct ByteMap {
    key_size: usize,
    value_size: usize,
    inner: ChainedMap<Box<[u8]>, Box<[u8]>, BytePolicy>,
}

impl ByteMap {
    /// Creates an empty table.
    ///
    /// `initial_capacity` of zero selects the default bucket count and small
    /// values are raised to the minimum. Without a `hash`, keys are hashed
    /// with [`djb2`], which reads them as NUL-terminated strings.
    ///
    /// # Panics
    ///
    /// If `key_size` or `value_size` is zero.
    pub fn new(
        initial_capacity: usize,
        hash: Option<HashFn>,
        key_size: usize,
        value_size: usize,
    ) -> Result<Self, Error> {
        assert!(key_size > 0, "ByteMap key size must be non-zero");
        assert!(value_size > 0, "ByteMap value size must be non-zero");
        let policy = BytePolicy::new(hash.unwrap_or(djb2));
        let inner = ChainedMap::with_config(MapConfig::with_capacity(initial_capacity), policy)?;
        Ok(Self {
            key_size,
            value_size,
            inner,
        })
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn load_factor(&self) -> f64 {
        self.inner.load_factor()
    }

    pub fn policy(&self) -> &BytePolicy {
        self.inner.policy()
    }

    /// Looks up `key`. A key longer than the key size is never present.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let key = fit(Part::Key, self.key_size, key).ok()?;
        self.inner.get(&key).map(|v| &**v)
    }

    /// Mutable access to a stored value. Its length cannot change.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut [u8]> {
        let key = fit(Part::Key, self.key_size, key).ok()?;
        self.inner.get_mut(&key).map(|v| &mut **v)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Stores copies of `key` and `value` unless `key` is already present,
    /// and returns the value now associated with `key`. See
    /// [`ChainedMap::add`].
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<&[u8], Error> {
        let key = fit(Part::Key, self.key_size, key)?;
        let value = fit(Part::Value, self.value_size, value)?;
        self.inner.add(&key, &value).map(|v| &**v)
    }

    pub fn remove(&mut self, key: &[u8]) -> bool {
        match fit(Part::Key, self.key_size, key) {
            Ok(key) => self.inner.remove(&key),
            Err(_) => false,
        }
    }

    /// Entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        let it: Iter<'_, Box<[u8]>, Box<[u8]>> = self.inner.iter();
        it.map(|(k, v)| (&**k, &**v))
    }

    // Policy setters. Each applies to every later call, including the release
    // of entries stored before the change. Pairing a new copy function with a
    // destroy function that expects buffers from the old one is the caller's
    // responsibility; buffers are owned, so a mismatch can leak semantics but
    // never memory.

    /// Replaces the key comparison. It must agree with the table's hash:
    /// keys comparing equal must hash equal.
    pub fn set_compare_fn(&mut self, compare: CompareFn) {
        self.inner.policy_mut().compare = compare;
    }

    pub fn set_key_copy_fn(&mut self, copy: CopyFn) {
        self.inner.policy_mut().copy_key = copy;
    }

    pub fn set_value_copy_fn(&mut self, copy: CopyFn) {
        self.inner.policy_mut().copy_value = copy;
    }

    pub fn set_key_destroy_fn(&mut self, destroy: DestroyFn) {
        self.inner.policy_mut().destroy_key = destroy;
    }

    pub fn set_value_destroy_fn(&mut self, destroy: DestroyFn) {
        self.inner.policy_mut().destroy_value = destroy;
    }

    /// Sets the shrink (`min`) and grow (`max`) load factors. The values are
    /// not checked against each other.
    pub fn set_load_factor_thresholds(&mut self, min: f64, max: f64) {
        self.inner.set_load_factor(LoadFactor::new(min, max));
    }

    /// Diagnostic dump with the fixed sizes in the header.
    pub fn inspect(&self, print_key: PrintFn, print_value: PrintFn) -> impl fmt::Display + '_ {
        self.inner
            .inspect(
                move |k, f| print_key(k, f),
                move |v, f| print_value(v, f),
            )
            .with_sizes(self.key_size, self.value_size)
    }

    /// Writes [`ByteMap::inspect`] to stdout.
    pub fn print(&self, print_key: PrintFn, print_value: PrintFn) {
        println!("{}", self.inspect(print_key, print_value));
    }
}

impl fmt::Debug for ByteMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteMap")
            .field("key_size", &self.key_size)
            .field("value_size", &self.value_size)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
