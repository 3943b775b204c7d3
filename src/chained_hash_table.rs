//! ChainedHashTable: separate chaining with in-place growth of the bucket array.

use crate::chain::{self, Link, Node};
use crate::error::TableError;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use hashbrown::hash_map::DefaultHashBuilder;
use log::trace;

/// Number of buckets of a new (or cleared) table.
pub const INITIAL_BUCKETS: usize = 8;
/// Factor by which the bucket array is multiplied when the table grows.
pub const GROWTH_FACTOR: usize = 8;

/// A hash map of unique keys, stored in one singly linked chain per bucket.
///
/// The table grows before an insertion would bring the load factor to 1.0:
/// the bucket array is extended by [`GROWTH_FACTOR`] and every existing node
/// is spliced into its new bucket without being reallocated. The bucket
/// count never shrinks except through [`clear`](Self::clear).
pub struct ChainedHashTable<K, V, S = DefaultHashBuilder> {
    hasher: S,
    buckets: Vec<Link<K, V>>,
    len: usize,
}

/// Work handed to the placement routine.
enum Pending<K, V> {
    /// A key/value pair that may or may not already be present.
    New { hash: u64, key: K, value: V },
    /// A live node unlinked from bucket `from` while growing.
    Relocated { node: Box<Node<K, V>>, from: usize },
}

enum Placement<V> {
    /// The key was present; its previous value is returned.
    Replaced(V),
    /// A node was linked in; `moved` is true when it now sits in a bucket
    /// other than the one it came from.
    Linked { moved: bool },
}

#[inline]
fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    // Unsigned reduction: defined for every hash value.
    (hash % bucket_count as u64) as usize
}

fn empty_buckets<K, V>(n: usize) -> Vec<Link<K, V>> {
    let mut buckets = Vec::with_capacity(n);
    buckets.resize_with(n, || None);
    buckets
}

impl<K, V> ChainedHashTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for ChainedHashTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedHashTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: empty_buckets(INITIAL_BUCKETS),
            len: 0,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current length of the bucket array.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Length of every bucket's chain, in bucket order.
    pub fn chain_lengths(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.buckets.iter().map(chain::len)
    }

    /// Free every node and return to [`INITIAL_BUCKETS`] empty buckets.
    pub fn clear(&mut self) {
        let freed: usize = self.buckets.iter_mut().map(chain::drop_chain).sum();
        debug_assert_eq!(freed, self.len);
        self.buckets.truncate(INITIAL_BUCKETS);
        self.buckets.shrink_to_fit();
        self.len = 0;
        trace!(target: "chained_hash_table", "clear: freed {freed} nodes");
    }

    /// Entries in bucket order, chain order within a bucket.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.buckets.iter(),
            node: None,
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            slots: self.buckets.iter_mut(),
            node: None,
            remaining: self.len,
        }
    }

    /// Every live key, in the same order as [`iter`](Self::iter).
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K, V, S> ChainedHashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn slot_of(&self, hash: u64) -> usize {
        bucket_index(hash, self.buckets.len())
    }

    /// Insert or overwrite; returns the previous value for `key`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the bucket array cannot grow (count overflow or allocation
    /// failure). Use [`try_insert`](Self::try_insert) to handle that case.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(prev) => prev,
            Err(err) => panic!("ChainedHashTable::insert: {err}"),
        }
    }

    /// Like [`insert`](Self::insert), but reports a failed grow instead of
    /// panicking. On error the table is unchanged and `key`/`value` are dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        // Hash before touching the structure so user code never runs mid-grow.
        let hash = self.make_hash(&key);
        if self.len + 1 >= self.buckets.len() {
            self.grow()?;
        }
        match self.place(Pending::New { hash, key, value }) {
            Placement::Replaced(prev) => Ok(Some(prev)),
            Placement::Linked { .. } => {
                self.len += 1;
                Ok(None)
            }
        }
    }

    /// Link `pending` into the bucket its hash selects under the current
    /// bucket count.
    fn place(&mut self, pending: Pending<K, V>) -> Placement<V> {
        match pending {
            Pending::New { hash, key, value } => {
                let idx = self.slot_of(hash);
                let head = &mut self.buckets[idx];
                if let Some(node) = chain::find_mut(head, hash, &key) {
                    return Placement::Replaced(core::mem::replace(&mut node.value, value));
                }
                chain::push_front(head, Node::new(hash, key, value));
                Placement::Linked { moved: false }
            }
            Pending::Relocated { node, from } => {
                // Keys are unique table-wide, so the target chain cannot hold
                // this key and no equality probe is needed.
                let idx = self.slot_of(node.hash);
                chain::push_front(&mut self.buckets[idx], node);
                Placement::Linked { moved: idx != from }
            }
        }
    }

    /// Multiply the bucket count by [`GROWTH_FACTOR`] and rehome every node.
    ///
    /// The first `old` slots keep their chains while the array is extended.
    /// Each old chain is then walked once: nodes whose bucket is unchanged
    /// stay linked, the others are unlinked and spliced onto the front of
    /// their new bucket. No node is allocated or freed.
    fn grow(&mut self) -> Result<(), TableError> {
        let old = self.buckets.len();
        let new = old
            .checked_mul(GROWTH_FACTOR)
            .ok_or(TableError::CapacityOverflow { bucket_count: old })?;
        self.buckets.try_reserve_exact(new - old)?;
        self.buckets.resize_with(new, || None);

        let mut relocated = 0usize;
        for i in 0..old {
            // `new` is a multiple of `old`, so a node leaving bucket `i` lands
            // in a slot >= `old`: slot `i` is never a target while detached
            // and relocated nodes are never walked twice.
            let mut detached = self.buckets[i].take();
            let mut cursor = &mut detached;
            loop {
                let j = match cursor.as_deref() {
                    None => break,
                    Some(node) => bucket_index(node.hash, new),
                };
                if j == i {
                    if let Some(node) = cursor {
                        cursor = &mut node.next;
                    }
                    continue;
                }
                if let Some(mut node) = cursor.take() {
                    *cursor = node.next.take();
                    let placed = self.place(Pending::Relocated { node, from: i });
                    debug_assert!(matches!(placed, Placement::Linked { moved: true }));
                    relocated += 1;
                }
            }
            self.buckets[i] = detached;
        }

        trace!(
            target: "chained_hash_table",
            "grow: {old} -> {new} buckets, {} entries, {relocated} relocated",
            self.len
        );
        Ok(())
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        chain::find(&self.buckets[self.slot_of(hash)], hash, q).map(|node| &node.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let idx = self.slot_of(hash);
        chain::find_mut(&mut self.buckets[idx], hash, q).map(|node| &mut node.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).is_some()
    }

    /// Remove `q` and return its value. Absent keys are a no-op; the bucket
    /// count is never reduced.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let idx = self.slot_of(hash);
        let node = chain::unlink(&mut self.buckets[idx], hash, q)?;
        self.len -= 1;
        let Node { key, value, .. } = *node;
        Some((key, value))
    }

    /// Structural checks used by the test suites: bucket placement, cached
    /// hashes, key uniqueness, element count and the load-factor bound.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let bucket_count = self.buckets.len();
        assert!(bucket_count >= INITIAL_BUCKETS);
        let mut total = 0;
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cur = head.as_deref();
            while let Some(node) = cur {
                assert_eq!(node.hash, self.make_hash(&node.key), "stale cached hash");
                assert_eq!(bucket_index(node.hash, bucket_count), i, "node in wrong bucket");
                let mut rest = node.next.as_deref();
                while let Some(other) = rest {
                    assert!(other.key != node.key, "duplicate key in chain");
                    rest = other.next.as_deref();
                }
                total += 1;
                cur = node.next.as_deref();
            }
        }
        assert_eq!(total, self.len, "len out of sync with chains");
        assert!(self.len < bucket_count, "load factor reached 1.0");
    }
}

impl<K, V, S> Drop for ChainedHashTable<K, V, S> {
    fn drop(&mut self) {
        for head in &mut self.buckets {
            chain::drop_chain(head);
        }
    }
}

impl<K, V, S> fmt::Debug for ChainedHashTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedHashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainedHashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedHashTable<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Iterator over immutable entries in `ChainedHashTable`.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Link<K, V>>,
    node: Option<&'a Node<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                self.remaining -= 1;
                return Some((&node.key, &node.value));
            }
            self.node = self.slots.next()?.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over mutable entries in `ChainedHashTable`.
pub struct IterMut<'a, K, V> {
    slots: core::slice::IterMut<'a, Link<K, V>>,
    node: Option<&'a mut Node<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node.take() {
                let Node {
                    key, value, next, ..
                } = node;
                self.node = next.as_deref_mut();
                self.remaining -= 1;
                return Some((&*key, value));
            }
            self.node = self.slots.next()?.as_deref_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}
