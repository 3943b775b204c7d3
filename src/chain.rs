//! Owned singly linked chains: the per-bucket storage of `ChainedHashTable`.
//!
//! Every node is exclusively owned by the link before it, which is either
//! a bucket slot or the `next` field of its predecessor. Splicing is
//! expressed as `take`/assign on those links.

use core::borrow::Borrow;

pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Hash of `key` under the owning table's hasher, computed once at insertion.
    pub(crate) hash: u64,
    pub(crate) next: Link<K, V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(hash: u64, key: K, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            hash,
            next: None,
        })
    }
}

/// Prepend an unlinked `node` to the chain owned by `head`.
#[inline]
pub(crate) fn push_front<K, V>(head: &mut Link<K, V>, mut node: Box<Node<K, V>>) {
    debug_assert!(node.next.is_none(), "node must be unlinked before it is pushed");
    node.next = head.take();
    *head = Some(node);
}

pub(crate) fn find<'a, K, V, Q>(head: &'a Link<K, V>, hash: u64, q: &Q) -> Option<&'a Node<K, V>>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    let mut cur = head.as_deref();
    while let Some(node) = cur {
        if node.hash == hash && node.key.borrow() == q {
            return Some(node);
        }
        cur = node.next.as_deref();
    }
    None
}

pub(crate) fn find_mut<'a, K, V, Q>(
    head: &'a mut Link<K, V>,
    hash: u64,
    q: &Q,
) -> Option<&'a mut Node<K, V>>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    let mut cur = head.as_deref_mut();
    while let Some(node) = cur {
        if node.hash == hash && node.key.borrow() == q {
            return Some(node);
        }
        cur = node.next.as_deref_mut();
    }
    None
}

/// Unlink the node holding `q` and hand it back. The link that owned it
/// (the bucket head or the predecessor's `next`) is patched to its successor.
pub(crate) fn unlink<K, V, Q>(head: &mut Link<K, V>, hash: u64, q: &Q) -> Option<Box<Node<K, V>>>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    // `cursor` is always the link that owns the node under inspection.
    let mut cursor = head;
    loop {
        let hit = match cursor.as_deref() {
            None => return None,
            Some(node) => node.hash == hash && node.key.borrow() == q,
        };
        if hit {
            let mut node = cursor.take()?;
            *cursor = node.next.take();
            return Some(node);
        }
        if let Some(node) = cursor {
            cursor = &mut node.next;
        }
    }
}

pub(crate) fn len<K, V>(head: &Link<K, V>) -> usize {
    let mut n = 0;
    let mut cur = head.as_deref();
    while let Some(node) = cur {
        n += 1;
        cur = node.next.as_deref();
    }
    n
}

/// Free every node of the chain one at a time and leave `head` empty.
///
/// Dropping a `Box` chain directly recurses once per node; a degenerate
/// hasher can build chains long enough to overflow the stack that way.
pub(crate) fn drop_chain<K, V>(head: &mut Link<K, V>) -> usize {
    let mut freed = 0;
    let mut cur = head.take();
    while let Some(mut node) = cur {
        cur = node.next.take();
        freed += 1;
    }
    freed
}
