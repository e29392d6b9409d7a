//! Bucket array: chain heads plus an arena of singly linked nodes.
//!
//! Nodes live in a `SlotMap` and link to each other by arena key, so moving
//! a node between buckets rewrites two links and never touches its key or
//! value. This layer knows nothing about policies; callers pass the stored
//! hash in and a match predicate for chain walks.

use crate::error::Error;
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    hash: u64,
    next: Option<DefaultKey>,
}

#[derive(Debug)]
pub(crate) struct BucketArray<K, V> {
    heads: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
}

fn alloc_heads(capacity: usize) -> Result<Vec<Option<DefaultKey>>, Error> {
    let mut heads = Vec::new();
    heads
        .try_reserve_exact(capacity)
        .map_err(|_| Error::BucketArray(capacity))?;
    heads.resize(capacity, None);
    Ok(heads)
}

impl<K, V> BucketArray<K, V> {
    /// Allocates `capacity` empty buckets, aborting on allocation failure
    /// like any other `Vec`. `capacity` must be non-zero.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            heads: vec![None; capacity],
            nodes: SlotMap::with_key(),
        }
    }

    /// Allocates `capacity` empty buckets. `capacity` must be non-zero.
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        debug_assert!(capacity > 0);
        Ok(Self {
            heads: alloc_heads(capacity)?,
            nodes: SlotMap::with_key(),
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.heads.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    /// First node in `hash`'s bucket whose key satisfies `is_match`.
    pub(crate) fn find(
        &self,
        hash: u64,
        mut is_match: impl FnMut(&K) -> bool,
    ) -> Option<DefaultKey> {
        let mut cur = self.heads[self.index(hash)];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if is_match(&node.key) {
                return Some(k);
            }
            cur = node.next;
        }
        None
    }

    #[inline]
    pub(crate) fn node(&self, k: DefaultKey) -> &Node<K, V> {
        &self.nodes[k]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, k: DefaultKey) -> &mut Node<K, V> {
        &mut self.nodes[k]
    }

    /// Links a new node at the head of its bucket's chain.
    pub(crate) fn push_front(&mut self, hash: u64, key: K, value: V) -> DefaultKey {
        let idx = self.index(hash);
        let next = self.heads[idx];
        let k = self.nodes.insert(Node {
            key,
            value,
            hash,
            next,
        });
        self.heads[idx] = Some(k);
        k
    }

    /// Unlinks the first matching node of `hash`'s bucket and hands back its
    /// key and value. The chain is consistent again before this returns.
    pub(crate) fn unlink(
        &mut self,
        hash: u64,
        mut is_match: impl FnMut(&K) -> bool,
    ) -> Option<(K, V)> {
        let idx = self.index(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.heads[idx];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            let next = node.next;
            if is_match(&node.key) {
                match prev {
                    Some(p) => self.nodes[p].next = next,
                    None => self.heads[idx] = next,
                }
                let node = self.nodes.remove(k)?;
                return Some((node.key, node.value));
            }
            prev = cur;
            cur = next;
        }
        None
    }

    /// Relinks every node into a fresh array of `new_capacity` buckets.
    ///
    /// On allocation failure the table is left untouched.
    pub(crate) fn resize(&mut self, new_capacity: usize) -> Result<(), Error> {
        debug_assert!(new_capacity > 0);
        let mut heads = alloc_heads(new_capacity)?;
        for &head in &self.heads {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut self.nodes[k];
                cur = node.next;
                let idx = (node.hash % new_capacity as u64) as usize;
                node.next = heads[idx];
                heads[idx] = Some(k);
            }
        }
        self.heads = heads;
        Ok(())
    }

    /// Walks one bucket's chain.
    pub(crate) fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            nodes: &self.nodes,
            cur: self.heads[bucket],
        }
    }

    /// Walks every chain in bucket order.
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            heads: self.heads.iter(),
            chain: Chain {
                nodes: &self.nodes,
                cur: None,
            },
        }
    }

    /// Empties the table, yielding every entry. Chain heads are reset first
    /// so the array is consistent while the caller releases entries.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.heads.iter_mut().for_each(|h| *h = None);
        self.nodes.drain().map(|(_, n)| (n.key, n.value))
    }
}

/// Iterator over the entries of a single bucket, head first.
pub(crate) struct Chain<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        let node = &nodes[self.cur?];
        self.cur = node.next;
        Some((&node.key, &node.value))
    }
}

/// Iterator over all entries, bucket by bucket.
pub struct Iter<'a, K, V> {
    heads: core::slice::Iter<'a, Option<DefaultKey>>,
    chain: Chain<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.chain.next() {
                return Some(item);
            }
            self.chain.cur = *self.heads.next()?;
        }
    }
}
