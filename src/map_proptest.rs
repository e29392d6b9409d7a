#![cfg(test)]

// Property tests for ChainedMap kept inside the crate so the counting and
// colliding policies can share one harness.

use crate::config::MIN_CAPACITY;
use crate::error::AllocError;
use crate::hash::djb2;
use crate::map::ChainedMap;
use crate::policy::{DefaultPolicy, Policy};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations so shrinking converges on small key sets.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    Remove(usize),
    Get(usize),
    Bump(usize, i32),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Bump(i, d)),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives `sut` and a std HashMap model through `ops`.
//
// Invariants checked after every op:
// - add never overwrites; it returns the first stored value.
// - get/remove agree with the model; absent removes change nothing.
// - len matches the model and the number of iterated entries.
// - load factor stays at or below max; a remove that leaves it below min
//   either shrank the table or found it at MIN_CAPACITY.
fn run<P>(sut: &mut ChainedMap<String, i32, P>, pool: &[String], ops: Vec<Op>) -> Result<(), TestCaseError>
where
    P: Policy<String, i32, Key = String, Value = i32>,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    let max = sut.thresholds().max;
    let min = sut.thresholds().min;

    for op in ops {
        match op {
            Op::Add(i, v) => {
                let k = &pool[i];
                let expected = *model.entry(k.clone()).or_insert(v);
                let got = *sut.add(k, &v).expect("copies never fail here");
                prop_assert_eq!(got, expected, "add must keep the first value");
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let before = sut.capacity();
                let removed = sut.remove(k);
                prop_assert_eq!(removed, model.remove(k).is_some());
                if removed {
                    prop_assert!(
                        sut.load_factor() >= min
                            || sut.capacity() < before
                            || sut.capacity() == MIN_CAPACITY
                    );
                } else {
                    prop_assert_eq!(sut.capacity(), before);
                }
                prop_assert!(sut.get(k).is_none());
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            Op::Bump(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(s), Some(m)) => {
                        *s = s.wrapping_add(d);
                        *m = m.wrapping_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence differs from model"),
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.iter().count(), model.len());
        prop_assert!(sut.load_factor() <= max);
        prop_assert!(sut.capacity() >= MIN_CAPACITY);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), cap in 0usize..40) {
        let mut sut: ChainedMap<String, i32, DefaultPolicy> = ChainedMap::with_capacity(cap);
        run(&mut sut, &pool, ops)?;
    }
}

// Tallies copies and releases; also lets a test force every key into one
// bucket.
#[derive(Default)]
struct Tally {
    copies: Cell<usize>,
    destroys: Cell<usize>,
}

struct TallyPolicy {
    tally: Rc<Tally>,
    collide: bool,
}

impl Policy<String, i32> for TallyPolicy {
    type Key = String;
    type Value = i32;

    fn hash(&self, key: &String) -> u64 {
        if self.collide {
            0
        } else {
            djb2(key.as_bytes())
        }
    }
    fn equals(&self, a: &String, b: &String) -> bool {
        a == b
    }
    fn copy_key(&self, key: &String) -> Result<String, AllocError> {
        self.tally.copies.set(self.tally.copies.get() + 1);
        Ok(key.clone())
    }
    fn copy_value(&self, value: &i32) -> Result<i32, AllocError> {
        self.tally.copies.set(self.tally.copies.get() + 1);
        Ok(*value)
    }
    fn destroy_key(&self, _key: String) {
        self.tally.destroys.set(self.tally.destroys.get() + 1);
    }
    fn destroy_value(&self, _value: i32) {
        self.tally.destroys.set(self.tally.destroys.get() + 1);
    }
}

// Property: same invariants with every key hashing to bucket 0, and every
// copy the table made is released exactly once by the time it drops.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), collide in any::<bool>()) {
        let tally = Rc::new(Tally::default());
        {
            let mut sut: ChainedMap<String, i32, TallyPolicy> =
                ChainedMap::with_policy(4, TallyPolicy { tally: tally.clone(), collide });
            run(&mut sut, &pool, ops)?;
            prop_assert_eq!(tally.copies.get(), tally.destroys.get() + 2 * sut.len());
        }
        prop_assert_eq!(tally.copies.get(), tally.destroys.get());
    }
}
