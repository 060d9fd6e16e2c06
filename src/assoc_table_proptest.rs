#![cfg(test)]

// Property tests for AssocTable kept inside the crate so they can check the
// chain invariants through `assert_invariants`.

use crate::assoc_table::AssocTable;
use crate::continuation::{Continuation, Step};
use crate::policy::{hash_bytes, KeyPolicy, Policy};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Policy that counts destroy calls and can force every key into one bin.
#[derive(Clone, Default)]
struct CountingPolicy {
    collide: bool,
    keys_destroyed: Rc<Cell<usize>>,
    values_destroyed: Rc<Cell<usize>>,
}

impl CountingPolicy {
    fn hash_str(&self, s: &str) -> u32 {
        if self.collide {
            0
        } else {
            hash_bytes(s.as_bytes())
        }
    }
}

impl KeyPolicy<Key> for CountingPolicy {
    fn hash(&self, key: &Key) -> u32 {
        self.hash_str(&key.0)
    }
    fn compare(&self, a: &Key, b: &Key) -> bool {
        a == b
    }
}

impl KeyPolicy<str> for CountingPolicy {
    fn hash(&self, key: &str) -> u32 {
        self.hash_str(key)
    }
    fn compare(&self, a: &str, b: &str) -> bool {
        a == b
    }
}

impl Policy<Key, i32> for CountingPolicy {
    fn destroy_key(&self, _key: Key) {
        self.keys_destroyed.set(self.keys_destroyed.get() + 1);
    }
    fn destroy_value(&self, _value: i32) {
        self.values_destroyed.set(self.values_destroyed.get() + 1);
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Take(usize),
    Lookup(usize),
    Contains(String),
    Walk,
    ContinuationWalk,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<OpI>)> {
    (1usize..=9, proptest::collection::vec("[a-z]{0,5}", 1..=8)).prop_flat_map(|(bins, pool)| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Take),
            2 => idx.clone().prop_map(OpI::Lookup),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => Just(OpI::Walk),
            1 => Just(OpI::ContinuationWalk),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (bins, pool.clone(), ops))
    })
}

// Model: per key, the stack of values inserted and not yet removed; the last
// element is the newest entry.
type Model = BTreeMap<Key, Vec<i32>>;

fn model_len(model: &Model) -> usize {
    model.values().map(Vec::len).sum()
}

fn live_entries(model: &Model) -> Model {
    model
        .iter()
        .filter(|(_, vs)| !vs.is_empty())
        .map(|(k, vs)| (k.clone(), vs.clone()))
        .collect()
}

fn walked_multiset(sut: &AssocTable<Key, i32, CountingPolicy>) -> BTreeMap<Key, Vec<i32>> {
    let mut seen: BTreeMap<Key, Vec<i32>> = BTreeMap::new();
    let mut c = Continuation::START;
    while let Step::Item { key, value, next } = sut.walk_continuation(c).unwrap() {
        seen.entry(key.clone()).or_default().push(*value);
        c = next;
    }
    seen
}

fn run(
    collide: bool,
    bins: usize,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let policy = CountingPolicy {
        collide,
        ..CountingPolicy::default()
    };
    let keys_destroyed = policy.keys_destroyed.clone();
    let values_destroyed = policy.values_destroyed.clone();
    let mut sut: AssocTable<Key, i32, CountingPolicy> =
        AssocTable::create(-1, bins, policy).unwrap();
    let mut model: Model = BTreeMap::new();
    let mut removed = 0usize;

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                prop_assert!(sut.insert(k.clone(), v).is_ok());
                model.entry(k).or_default().push(v);
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let before = values_destroyed.get();
                sut.remove(k.0.as_str());
                let expected = model.get_mut(&k).and_then(Vec::pop);
                if expected.is_some() {
                    removed += 1;
                    prop_assert_eq!(values_destroyed.get(), before + 1);
                } else {
                    prop_assert_eq!(
                        values_destroyed.get(),
                        before,
                        "absent remove must not destroy"
                    );
                }
            }
            OpI::Take(i) => {
                let k = key_from(&pool, i);
                let taken = sut.take(&k);
                let expected = model.get_mut(&k).and_then(Vec::pop);
                prop_assert_eq!(
                    taken.map(|(kk, v)| (kk.0, v)),
                    expected.map(|v| (k.0.clone(), v))
                );
            }
            OpI::Lookup(i) => {
                let k = key_from(&pool, i);
                let newest = model.get(&k).and_then(|vs| vs.last()).copied();
                prop_assert_eq!(sut.get(&k).copied(), newest);
                prop_assert_eq!(*sut.lookup(&k), newest.unwrap_or(-1));
            }
            OpI::Contains(s) => {
                let has_model = model.get(&Key(s.clone())).is_some_and(|vs| !vs.is_empty());
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Walk => {
                let mut seen: BTreeMap<Key, Vec<i32>> = BTreeMap::new();
                sut.walk(|k, v| {
                    seen.entry(k.clone()).or_default().push(*v);
                    Ok::<(), ()>(())
                })
                .unwrap();
                // Chains are newest-first; the model keeps oldest-first.
                for vs in seen.values_mut() {
                    vs.reverse();
                }
                prop_assert_eq!(seen, live_entries(&model));
            }
            OpI::ContinuationWalk => {
                let mut seen = walked_multiset(&sut);
                for vs in seen.values_mut() {
                    vs.reverse();
                }
                prop_assert_eq!(seen, live_entries(&model));
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.count(), model_len(&model));
        prop_assert_eq!(sut.is_empty(), model_len(&model) == 0);
        prop_assert_eq!(keys_destroyed.get(), removed);
        sut.assert_invariants();
    }

    let remaining = sut.count();
    drop(sut);
    prop_assert_eq!(keys_destroyed.get(), removed + remaining);
    prop_assert_eq!(values_destroyed.get(), removed + remaining);
    Ok(())
}

// Property: State-machine equivalence against a model multimap.
// Invariants exercised across random operation sequences:
// - `count` equals inserts minus successful removes/takes after every op.
// - Lookup returns the newest value for a key, or the default on a miss.
// - `remove` of an absent key destroys nothing; of a present key destroys
//   exactly one key and one value.
// - `walk` and a full continuation walk both yield exactly the live entries,
//   newest first within a key.
// - Every entry sits in the bin its hash selects.
// - Dropping the table destroys each remaining key and value once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((bins, pool, ops) in arb_scenario()) {
        run(false, bins, pool, ops)?;
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hash). Every entry shares one chain, which
// stresses compare-based resolution and chain positions in continuations.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((bins, pool, ops) in arb_scenario()) {
        run(true, bins, pool, ops)?;
    }
}
