//! ChainedMap: separate-chaining table driven by a policy bundle.
//!
//! Every operation hashes the key once, picks bucket `hash % capacity` and
//! walks that bucket's chain with the policy's `equals`. Adds and removes
//! then check the load factor and grow or shrink the bucket array by half.

use crate::buckets::{BucketArray, Iter};
use crate::config::{ratio, LoadFactor, MapConfig, DEFAULT_CAPACITY};
use crate::error::Error;
use crate::policy::{DefaultPolicy, HasherPolicy, Policy};
use crate::reentrancy::ReentrancyCheck;
use core::borrow::Borrow;
use core::fmt;

pub struct ChainedMap<K, V, P = DefaultPolicy>
where
    P: Policy<K, V>,
{
    policy: P,
    table: BucketArray<K, V>,
    load_factor: LoadFactor,
    reentrancy: ReentrancyCheck,
}

impl<K, V> ChainedMap<K, V>
where
    DefaultPolicy: Policy<K, V>,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, DefaultPolicy)
    }
}

impl<K, V> Default for ChainedMap<K, V>
where
    DefaultPolicy: Policy<K, V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedMap<K, V, HasherPolicy<S>>
where
    HasherPolicy<S>: Policy<K, V>,
{
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        Self::with_policy(capacity, HasherPolicy::new(hasher))
    }
}

fn resize_to<K, V>(table: &mut BucketArray<K, V>, target: usize) {
    let from = table.capacity();
    match table.resize(target) {
        Ok(()) => log::debug!(
            "resized bucket array {} -> {} ({} entries)",
            from,
            target,
            table.len()
        ),
        Err(e) => log::warn!("{}; keeping {} buckets", e, from),
    }
}

impl<K, V, P> ChainedMap<K, V, P>
where
    P: Policy<K, V>,
{
    /// Builds a table with `capacity` buckets (zero picks the default, small
    /// values are raised to `MIN_CAPACITY`). Allocation failure aborts, as
    /// with any `Vec`; use [`ChainedMap::with_config`] to observe it instead.
    pub fn with_policy(capacity: usize, policy: P) -> Self {
        let config = MapConfig::with_capacity(capacity);
        Self {
            policy,
            table: BucketArray::with_capacity(config.bucket_count()),
            load_factor: config.load_factor,
            reentrancy: ReentrancyCheck::new(),
        }
    }

    /// Builds a table from `config`, reporting a failed bucket allocation as
    /// `Error::BucketArray` instead of aborting.
    pub fn with_config(config: MapConfig, policy: P) -> Result<Self, Error> {
        let table = BucketArray::try_with_capacity(config.bucket_count())?;
        Ok(Self {
            policy,
            table,
            load_factor: config.load_factor,
            reentrancy: ReentrancyCheck::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// `len / capacity`.
    pub fn load_factor(&self) -> f64 {
        ratio(self.table.len(), self.table.capacity())
    }

    pub fn thresholds(&self) -> LoadFactor {
        self.load_factor
    }

    /// Replaces the grow/shrink thresholds. Takes effect on the next add or
    /// remove; the table is not rebalanced immediately.
    pub fn set_load_factor(&mut self, load_factor: LoadFactor) {
        self.load_factor = load_factor;
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Mutable policy access for the byte layer's setters. Whatever changes
    /// here must keep `hash` stable for stored keys.
    pub(crate) fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Entries in bucket order; no other order is promised.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    /// Diagnostic dump of sizes and every bucket's chain.
    pub fn inspect<FK, FV>(&self, fmt_key: FK, fmt_value: FV) -> Inspect<'_, K, V, FK, FV>
    where
        FK: Fn(&K, &mut fmt::Formatter<'_>) -> fmt::Result,
        FV: Fn(&V, &mut fmt::Formatter<'_>) -> fmt::Result,
    {
        Inspect {
            table: &self.table,
            sizes: None,
            fmt_key,
            fmt_value,
        }
    }

    /// Writes [`ChainedMap::inspect`] to stdout.
    pub fn print<FK, FV>(&self, fmt_key: FK, fmt_value: FV)
    where
        FK: Fn(&K, &mut fmt::Formatter<'_>) -> fmt::Result,
        FV: Fn(&V, &mut fmt::Formatter<'_>) -> fmt::Result,
    {
        println!("{}", self.inspect(fmt_key, fmt_value));
    }
}

impl<K, V, P> ChainedMap<K, V, P>
where
    P: Policy<K, V>,
    K: Borrow<P::Key>,
    V: Borrow<P::Value>,
{
    pub fn get(&self, key: &P::Key) -> Option<&V> {
        let _g = self.reentrancy.enter("get");
        let hash = self.policy.hash(key);
        let k = self
            .table
            .find(hash, |stored| self.policy.equals(key, stored.borrow()))?;
        Some(&self.table.node(k).value)
    }

    pub fn get_mut(&mut self, key: &P::Key) -> Option<&mut V> {
        let _g = self.reentrancy.enter("get_mut");
        let hash = self.policy.hash(key);
        let policy = &self.policy;
        let k = self
            .table
            .find(hash, |stored| policy.equals(key, stored.borrow()))?;
        Some(&mut self.table.node_mut(k).value)
    }

    pub fn contains_key(&self, key: &P::Key) -> bool {
        self.get(key).is_some()
    }

    /// Associates a copy of `value` with a copy of `key` and returns the
    /// stored value.
    ///
    /// An existing key is left alone: its stored value is returned and
    /// `value` is ignored. Callers wanting to replace a value remove the key
    /// first.
    ///
    /// If either copy fails nothing is inserted and the table is unchanged;
    /// a key copied before a failed value copy goes through `destroy_key`.
    pub fn add(&mut self, key: &P::Key, value: &P::Value) -> Result<&V, Error> {
        let _g = self.reentrancy.enter("add");
        let hash = self.policy.hash(key);
        let policy = &self.policy;
        if let Some(k) = self
            .table
            .find(hash, |stored| policy.equals(key, stored.borrow()))
        {
            log::trace!("add: key already present, keeping the stored value");
            return Ok(&self.table.node(k).value);
        }

        let owned_key = self.policy.copy_key(key).map_err(|e| {
            log::warn!("add: key copy failed");
            Error::KeyCopy(e)
        })?;
        let owned_value = match self.policy.copy_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("add: value copy failed, releasing the copied key");
                self.policy.destroy_key(owned_key);
                return Err(Error::ValueCopy(e));
            }
        };

        // Grow before linking so the node lands in its final bucket.
        if let Some(target) = self
            .load_factor
            .grow_target(self.table.len() + 1, self.table.capacity())
        {
            resize_to(&mut self.table, target);
        }
        let k = self.table.push_front(hash, owned_key, owned_value);
        Ok(&self.table.node(k).value)
    }

    /// Removes `key`, releasing its stored key and value through the policy.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, key: &P::Key) -> bool {
        let _g = self.reentrancy.enter("remove");
        let hash = self.policy.hash(key);
        let policy = &self.policy;
        let Some((k, v)) = self
            .table
            .unlink(hash, |stored| policy.equals(key, stored.borrow()))
        else {
            return false;
        };
        self.policy.destroy_key(k);
        self.policy.destroy_value(v);

        if let Some(target) = self
            .load_factor
            .shrink_target(self.table.len(), self.table.capacity())
        {
            resize_to(&mut self.table, target);
        }
        true
    }
}

impl<K, V, P> Drop for ChainedMap<K, V, P>
where
    P: Policy<K, V>,
{
    fn drop(&mut self) {
        let _g = self.reentrancy.enter("drop");
        let policy = &self.policy;
        for (key, value) in self.table.drain() {
            policy.destroy_key(key);
            policy.destroy_value(value);
        }
    }
}

impl<K, V, P> fmt::Debug for ChainedMap<K, V, P>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: Policy<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.table.iter()).finish()
    }
}

impl<'a, K, V, P> IntoIterator for &'a ChainedMap<K, V, P>
where
    P: Policy<K, V>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Display adapter returned by [`ChainedMap::inspect`].
pub struct Inspect<'a, K, V, FK, FV> {
    table: &'a BucketArray<K, V>,
    sizes: Option<(usize, usize)>,
    fmt_key: FK,
    fmt_value: FV,
}

impl<K, V, FK, FV> Inspect<'_, K, V, FK, FV> {
    /// Adds fixed key/value byte sizes to the header.
    pub(crate) fn with_sizes(mut self, key_size: usize, value_size: usize) -> Self {
        self.sizes = Some((key_size, value_size));
        self
    }
}

struct Adapter<'a, T, F>(&'a T, &'a F);

impl<T, F> fmt::Display for Adapter<'_, T, F>
where
    F: Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.1)(self.0, f)
    }
}

impl<K, V, FK, FV> fmt::Display for Inspect<'_, K, V, FK, FV>
where
    FK: Fn(&K, &mut fmt::Formatter<'_>) -> fmt::Result,
    FV: Fn(&V, &mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, capacity) = (self.table.len(), self.table.capacity());
        writeln!(f, "(hashmap):")?;
        writeln!(f, "{{")?;
        if let Some((key_size, value_size)) = self.sizes {
            writeln!(f, "    key_size: {} bytes", key_size)?;
            writeln!(f, "    value_size: {} bytes", value_size)?;
        }
        writeln!(f, "    capacity: {}", capacity)?;
        writeln!(f, "    count: {}", len)?;
        writeln!(f, "    load_factor: {:.2}", ratio(len, capacity))?;
        writeln!(f, "    table:")?;
        writeln!(f, "    [")?;
        let mut first = true;
        for bucket in 0..capacity {
            for (k, v) in self.table.chain(bucket) {
                if !first {
                    writeln!(f, ",")?;
                }
                first = false;
                write!(
                    f,
                    "\t({}) : {}  =>  {}",
                    bucket,
                    Adapter(k, &self.fmt_key),
                    Adapter(v, &self.fmt_value)
                )?;
            }
        }
        if !first {
            writeln!(f)?;
        }
        writeln!(f, "    ]")?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_CAPACITY;
    use crate::error::AllocError;
    use crate::hash::djb2;
    use std::cell::Cell;
    use std::rc::Rc;

    fn s(k: &str) -> String {
        k.to_string()
    }

    /// Invariant: every entry sits in bucket `hash % capacity` and the chains
    /// hold exactly `len()` entries.
    fn assert_placement<K, V, P>(m: &ChainedMap<K, V, P>)
    where
        P: Policy<K, V>,
        K: Borrow<P::Key>,
        V: Borrow<P::Value>,
    {
        let mut seen = 0;
        for bucket in 0..m.capacity() {
            for (k, _) in m.table.chain(bucket) {
                let h = m.policy.hash(k.borrow());
                assert_eq!((h % m.capacity() as u64) as usize, bucket);
                seen += 1;
            }
        }
        assert_eq!(seen, m.len());
        assert_eq!(m.iter().count(), m.len());
    }

    #[test]
    fn five_people_two_removed() {
        let mut m: ChainedMap<String, i32> = ChainedMap::with_capacity(16);
        let people = [("Ruben", 19), ("Thais", 17), ("Iseut", 15), ("Jules", 31), ("Jeane", 46)];
        for (name, age) in people {
            assert_eq!(*m.add(&s(name), &age).unwrap(), age);
        }
        for (name, age) in people {
            assert_eq!(m.get(&s(name)), Some(&age));
        }

        assert!(m.remove(&s("Jeane")));
        assert!(m.remove(&s("Jules")));
        assert_eq!(m.get(&s("Jeane")), None);
        assert_eq!(m.get(&s("Jules")), None);
        for (name, age) in &people[..3] {
            assert_eq!(m.get(&s(name)), Some(age));
        }
        assert_eq!(m.len(), 3);
        assert_placement(&m);
    }

    #[test]
    fn add_never_overwrites() {
        let mut m: ChainedMap<String, i32> = ChainedMap::new();
        assert_eq!(*m.add(&s("k"), &1).unwrap(), 1);
        assert_eq!(*m.add(&s("k"), &2).unwrap(), 1);
        assert_eq!(m.get(&s("k")), Some(&1));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn grows_from_small_capacity() {
        let mut m: ChainedMap<String, i32> = ChainedMap::with_capacity(4);
        assert_eq!(m.capacity(), 4);
        for i in 0..100 {
            m.add(&format!("element: {i}"), &i).unwrap();
            assert!(m.load_factor() <= m.thresholds().max);
        }
        assert!(m.capacity() > 4);
        assert!(m.load_factor() <= 0.75);
        assert_eq!(m.len(), 100);
        for i in 0..100 {
            assert_eq!(m.get(&format!("element: {i}")), Some(&i));
        }
        assert_placement(&m);
    }

    #[test]
    fn shrinks_after_removals_down_to_floor() {
        let mut m: ChainedMap<String, i32> = ChainedMap::with_capacity(4);
        for i in 0..64 {
            m.add(&i.to_string(), &i).unwrap();
        }
        let grown = m.capacity();
        for i in 0..64 {
            assert!(m.remove(&i.to_string()));
            assert_placement(&m);
        }
        assert!(m.is_empty());
        assert!(m.capacity() < grown);
        assert_eq!(m.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn small_capacity_is_clamped_and_zero_defaults() {
        let m: ChainedMap<String, i32> = ChainedMap::with_capacity(1);
        assert_eq!(m.capacity(), MIN_CAPACITY);
        let m: ChainedMap<String, i32> = ChainedMap::with_capacity(0);
        assert_eq!(m.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn remove_absent_is_a_no_op() {
        let mut m: ChainedMap<String, i32> = ChainedMap::new();
        m.add(&s("a"), &1).unwrap();
        let cap = m.capacity();
        assert!(!m.remove(&s("b")));
        assert_eq!(m.len(), 1);
        assert_eq!(m.capacity(), cap);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut m: ChainedMap<String, i32> = ChainedMap::new();
        m.add(&s("a"), &1).unwrap();
        *m.get_mut(&s("a")).unwrap() += 41;
        assert_eq!(m.get(&s("a")), Some(&42));
        assert!(m.get_mut(&s("b")).is_none());
    }

    #[test]
    fn with_config_reports_unallocatable_array() {
        let r: Result<ChainedMap<String, i32>, _> =
            ChainedMap::with_config(MapConfig::with_capacity(usize::MAX), DefaultPolicy);
        assert!(matches!(r, Err(Error::BucketArray(_))));

        let cfg = MapConfig::with_capacity(8).load_factor(LoadFactor::new(0.1, 0.5));
        let m: ChainedMap<String, i32> = ChainedMap::with_config(cfg, DefaultPolicy).unwrap();
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.thresholds(), LoadFactor::new(0.1, 0.5));
    }

    #[test]
    fn custom_thresholds_drive_growth() {
        let mut m: ChainedMap<String, i32> = ChainedMap::with_capacity(8);
        m.set_load_factor(LoadFactor::new(0.0, 0.5));
        for i in 0..5 {
            m.add(&i.to_string(), &i).unwrap();
        }
        // 5 / 8 > 0.5 triggered a grow to 12.
        assert_eq!(m.capacity(), 12);
    }

    #[derive(Default)]
    struct Counters {
        fail_key: Cell<bool>,
        fail_value: Cell<bool>,
        keys_destroyed: Cell<usize>,
        values_destroyed: Cell<usize>,
    }

    struct Counting(Rc<Counters>);

    impl Policy<String, i32> for Counting {
        type Key = String;
        type Value = i32;

        fn hash(&self, key: &String) -> u64 {
            djb2(key.as_bytes())
        }
        fn equals(&self, a: &String, b: &String) -> bool {
            a == b
        }
        fn copy_key(&self, key: &String) -> Result<String, AllocError> {
            if self.0.fail_key.get() {
                Err(AllocError)
            } else {
                Ok(key.clone())
            }
        }
        fn copy_value(&self, value: &i32) -> Result<i32, AllocError> {
            if self.0.fail_value.get() {
                Err(AllocError)
            } else {
                Ok(*value)
            }
        }
        fn destroy_key(&self, _key: String) {
            self.0.keys_destroyed.set(self.0.keys_destroyed.get() + 1);
        }
        fn destroy_value(&self, _value: i32) {
            self.0.values_destroyed.set(self.0.values_destroyed.get() + 1);
        }
    }

    #[test]
    fn failed_copies_leave_table_unchanged() {
        let c = Rc::new(Counters::default());
        let mut m: ChainedMap<String, i32, Counting> =
            ChainedMap::with_policy(4, Counting(c.clone()));
        for i in 0..3 {
            m.add(&i.to_string(), &i).unwrap();
        }
        // The next add would grow 4 -> 6.
        let cap = m.capacity();

        c.fail_key.set(true);
        assert_eq!(m.add(&s("x"), &9), Err(Error::KeyCopy(AllocError)));
        assert_eq!(c.keys_destroyed.get(), 0);
        c.fail_key.set(false);

        c.fail_value.set(true);
        assert_eq!(m.add(&s("x"), &9), Err(Error::ValueCopy(AllocError)));
        assert_eq!(c.keys_destroyed.get(), 1, "copied key must be released");
        assert_eq!(c.values_destroyed.get(), 0);
        c.fail_value.set(false);

        assert_eq!(m.len(), 3);
        assert_eq!(m.capacity(), cap);
        assert_eq!(m.get(&s("x")), None);
        assert_placement(&m);

        assert_eq!(*m.add(&s("x"), &9).unwrap(), 9);
        assert_eq!(m.capacity(), 6);
    }

    #[test]
    fn every_entry_destroyed_exactly_once() {
        let c = Rc::new(Counters::default());
        {
            let mut m: ChainedMap<String, i32, Counting> =
                ChainedMap::with_policy(4, Counting(c.clone()));
            for i in 0..20 {
                m.add(&i.to_string(), &i).unwrap();
            }
            // Duplicate adds copy nothing and destroy nothing.
            m.add(&s("3"), &100).unwrap();
            assert_eq!(c.keys_destroyed.get(), 0);

            for i in 0..5 {
                assert!(m.remove(&i.to_string()));
            }
            assert_eq!(c.keys_destroyed.get(), 5);
            assert_eq!(c.values_destroyed.get(), 5);
        }
        assert_eq!(c.keys_destroyed.get(), 20);
        assert_eq!(c.values_destroyed.get(), 20);
    }

    #[test]
    fn inspect_visits_every_entry_once() {
        let mut m: ChainedMap<String, i32> = ChainedMap::with_capacity(16);
        for (k, v) in [("Ruben", 19), ("Thais", 17), ("Iseut", 15)] {
            m.add(&s(k), &v).unwrap();
        }
        let out = m
            .inspect(|k, f| write!(f, "{:?}", k), |v, f| write!(f, "{}", v))
            .to_string();
        assert_eq!(out.matches("=>").count(), 3);
        assert!(out.contains("\"Ruben\"  =>  19"));
        assert!(out.contains("capacity: 16"));
        assert!(out.contains("count: 3"));
        assert!(out.contains("load_factor: 0.19"));
        assert!(!out.contains("key_size"));

        let empty: ChainedMap<String, i32> = ChainedMap::new();
        let out = empty
            .inspect(|k, f| write!(f, "{}", k), |v, f| write!(f, "{}", v))
            .to_string();
        assert!(out.contains("    [\n    ]"));
    }

    #[test]
    fn debug_lists_entries() {
        let mut m: ChainedMap<String, i32> = ChainedMap::new();
        m.add(&s("only"), &1).unwrap();
        assert_eq!(format!("{:?}", m), "{\"only\": 1}");
    }

    #[test]
    fn constant_hash_still_resolves_by_equality() {
        struct Const;
        impl Policy<u32, u32> for Const {
            type Key = u32;
            type Value = u32;
            fn hash(&self, _key: &u32) -> u64 {
                0
            }
            fn equals(&self, a: &u32, b: &u32) -> bool {
                a == b
            }
            fn copy_key(&self, key: &u32) -> Result<u32, AllocError> {
                Ok(*key)
            }
            fn copy_value(&self, value: &u32) -> Result<u32, AllocError> {
                Ok(*value)
            }
        }

        let mut m: ChainedMap<u32, u32, Const> = ChainedMap::with_policy(4, Const);
        for i in 0..10 {
            m.add(&i, &(i * 10)).unwrap();
        }
        assert_eq!(m.table.chain(0).count(), 10);
        for i in 0..10 {
            assert_eq!(m.get(&i), Some(&(i * 10)));
        }
        assert!(m.remove(&4));
        assert_eq!(m.get(&4), None);
        assert_eq!(m.len(), 9);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_equals_during_get() {
        struct Reentrant {
            map: Cell<*const ChainedMap<String, i32, Reentrant>>,
        }
        impl Policy<String, i32> for Reentrant {
            type Key = String;
            type Value = i32;
            fn hash(&self, _key: &String) -> u64 {
                0
            }
            fn equals(&self, a: &String, b: &String) -> bool {
                let m = self.map.get();
                if !m.is_null() {
                    // Re-enter the same map while its `get` is still running.
                    unsafe {
                        let _ = (*m).get(a);
                    }
                }
                a == b
            }
            fn copy_key(&self, key: &String) -> Result<String, AllocError> {
                Ok(key.clone())
            }
            fn copy_value(&self, value: &i32) -> Result<i32, AllocError> {
                Ok(*value)
            }
        }

        let mut m: ChainedMap<String, i32, Reentrant> = ChainedMap::with_policy(
            4,
            Reentrant {
                map: Cell::new(core::ptr::null()),
            },
        );
        m.add(&s("a"), &1).unwrap();
        m.policy().map.set(&m as *const _);

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.get(&s("b"));
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");

        m.policy().map.set(core::ptr::null());
        assert_eq!(m.get(&s("a")), Some(&1));
    }
}
