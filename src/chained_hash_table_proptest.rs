#![cfg(test)]

// Property tests for ChainedHashTable kept inside the crate so they can
// check structural invariants on private state after every operation.

use crate::chained_hash_table::{ChainedHashTable, GROWTH_FACTOR, INITIAL_BUCKETS};
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
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

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    // Pools larger than 64 keys make the second grow (64 -> 512) reachable.
    proptest::collection::vec("[a-z]{0,6}", 1..=96).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            8 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,6}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S>(
    mut sut: ChainedHashTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let buckets_before = sut.bucket_count();
                let len_before = sut.len();
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
                // A grow fires exactly when the pre-insert count plus one
                // reaches the bucket count.
                let expected = if len_before + 1 >= buckets_before {
                    buckets_before * GROWTH_FACTOR
                } else {
                    buckets_before
                };
                prop_assert_eq!(sut.bucket_count(), expected);
                prop_assert!(sut.load_factor() < 1.0);
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let buckets_before = sut.bucket_count();
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert_eq!(sut.bucket_count(), buckets_before, "remove never shrinks");
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(v), Some(mv)) => {
                        *v = v.wrapping_add(d);
                        *mv = mv.wrapping_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", s, m),
                }
            }
            OpI::Iterate => {
                let s_entries: BTreeSet<(Key, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m_entries: BTreeSet<(Key, i32)> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(sut.iter().count(), sut.len());
                prop_assert_eq!(s_entries, m_entries);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), INITIAL_BUCKETS);
            }
        }

        // Post-conditions after each op
        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.chain_lengths().sum::<usize>(), sut.len());
        prop_assert_eq!(sut.keys().len(), sut.len());
    }
    Ok(())
}

// Property: State-machine equivalence against hashbrown::HashMap.
// Invariants exercised across random operation sequences:
// - Insert overwrites in place and returns the previous value; the bucket
//   count grows by 8x exactly when the load factor would reach 1.0.
// - Lookups, removals and borrowed `contains_key` match the model.
// - Every node sits in the bucket its cached hash selects; no duplicate keys.
// - `len`, chain lengths and iteration length agree after every step.
// - `clear` returns to the initial bucket count.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashTable::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Low-entropy variant: only the low 8 bits of the real hash survive. The first
// grow splits chains between staying and moving nodes; past 256 buckets the
// upper slots stay empty and chains lengthen.
#[derive(Clone, Default)]
struct NarrowBuildHasher;
struct NarrowHasher(std::collections::hash_map::DefaultHasher);
impl BuildHasher for NarrowBuildHasher {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> Self::Hasher {
        NarrowHasher(Default::default())
    }
}
impl Hasher for NarrowHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.write(bytes);
    }
    fn finish(&self) -> u64 {
        self.0.finish() & 0xff
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). Grows never relocate anything here.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_narrow_hashes((pool, ops) in arb_scenario()) {
        run_state_machine(ChainedHashTable::with_hasher(NarrowBuildHasher), pool, ops)?;
    }
}

// Property: a grow preserves every value and the key set, regardless of how
// the old chains split between staying and moving nodes.
proptest! {
    #[test]
    fn prop_grow_preserves_membership(keys in proptest::collection::btree_set(any::<u64>(), 8)) {
        let keys: Vec<u64> = keys.into_iter().collect();
        let (first, last) = keys.split_at(7);
        let mut t: ChainedHashTable<u64, u64> = ChainedHashTable::new();
        for &k in first {
            t.insert(k, k.wrapping_mul(3));
        }
        prop_assert_eq!(t.bucket_count(), INITIAL_BUCKETS);
        let before: Vec<(u64, u64)> = first.iter().map(|&k| (k, *t.get(&k).unwrap())).collect();

        t.insert(last[0], 0);
        prop_assert_eq!(t.bucket_count(), INITIAL_BUCKETS * GROWTH_FACTOR);

        for (k, v) in before {
            prop_assert_eq!(t.get(&k), Some(&v));
        }
        t.assert_invariants();
    }
}
