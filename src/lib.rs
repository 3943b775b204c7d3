//! chained-hash-table: a separately chained hash map whose bucket array
//! grows in place, rehoming existing nodes instead of reallocating them.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a hash map where the interesting part, the resize, is a
//!   sequence of ownership transfers that are easy to reason about.
//! - Layers:
//!   - `chain`: owned singly linked lists (`Option<Box<Node>>` links) with
//!     the primitives the table needs: prepend, find, unlink-by-key and
//!     iterative teardown.
//!   - `ChainedHashTable<K, V, S>`: the bucket array, element count and
//!     hasher; owns the load-factor policy and the grow algorithm.
//!
//! Constraints
//! - Single-threaded. Mutation goes through `&mut self`.
//! - Bucket count starts at 8 and is multiplied by 8 whenever an insert
//!   would bring the load factor to 1.0. After every insert
//!   `len() < bucket_count()`.
//! - One heap node per entry, allocated on first insert of a key and
//!   freed exactly once (remove, clear, or drop). Growing never allocates
//!   or frees a node.
//! - No `unsafe`: every splice is `Option::take` plus an assignment.
//!
//! Grow
//! - The slot vector is extended to 8x its length; the old slots keep
//!   their chains. Each old chain is walked with a cursor on the link that
//!   owns the current node. Nodes whose bucket is unchanged are stepped
//!   over; the rest are unlinked (the owning link now points at the
//!   successor) and prepended to their new bucket.
//! - Because the new count is a multiple of the old one, a node leaving
//!   bucket `i` always lands in a slot past the old range, so no node is
//!   visited twice.
//!
//! Hasher and rehashing invariants
//! - Each node stores its `u64` hash and indexing after insertion always
//!   uses the stored hash; `K: Hash` is never invoked by a grow. A
//!   panicking `Hash` impl therefore cannot interrupt a resize.
//! - Bucket index is `hash % bucket_count` on the unsigned hash, which is
//!   defined for every hash value.
//!
//! Failure semantics
//! - Absent keys are ordinary outcomes (`None` / `false` / no-op).
//! - `try_insert` reports a bucket array that cannot grow as a
//!   [`TableError`] and leaves the table untouched; `insert` panics in the
//!   same situation.
//!
//! Notes and non-goals
//! - Iteration order is bucket-major and otherwise unspecified.
//! - No persistence, no concurrent access, no shrinking on remove.

mod chain;
mod chained_hash_table;
#[cfg(test)]
mod chained_hash_table_proptest;
mod error;

// Public surface
pub use chained_hash_table::{
    ChainedHashTable, Iter, IterMut, Keys, Values, GROWTH_FACTOR, INITIAL_BUCKETS,
};
pub use error::TableError;
