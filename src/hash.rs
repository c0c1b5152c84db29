//! Chained hash table with lock-free insertion and removal.
//!
//! Every bucket holds an immutable singly-linked chain behind an
//! [`ArcSwapOption`]. Writers build a new chain head and publish it with a
//! compare-and-swap on the bucket, retrying when another writer got there
//! first. Readers never block and always see a complete chain.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use arc_swap::ArcSwapOption;

/// Bucket count of the general-purpose table.
pub const FC_HASH_SIZE: usize = 227;

pub type FcHashFunc<K> = fn(&K) -> u32;
pub type FcCompareFunc<K> = fn(&K, &K) -> bool;

struct FcHashBucket<K, V> {
    key: K,
    value: V,
    next: Option<Arc<FcHashBucket<K, V>>>,
}

pub struct FcHashTable<K, V> {
    buckets: Box<[ArcSwapOption<FcHashBucket<K, V>>]>,
    hash: FcHashFunc<K>,
    compare: FcCompareFunc<K>,
}

fn same_head<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl<K: Clone, V: Clone> FcHashTable<K, V> {
    pub fn new(hash: FcHashFunc<K>, compare: FcCompareFunc<K>) -> Self {
        Self::with_buckets(FC_HASH_SIZE, hash, compare)
    }

    pub fn with_buckets(n: usize, hash: FcHashFunc<K>, compare: FcCompareFunc<K>) -> Self {
        let buckets = (0..n.max(1))
            .map(|_| ArcSwapOption::empty())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { buckets, hash, compare }
    }

    fn bucket(&self, key: &K) -> &ArcSwapOption<FcHashBucket<K, V>> {
        let h = (self.hash)(key) as usize;
        &self.buckets[h % self.buckets.len()]
    }

    /// Clone of the value stored under `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let head = self.bucket(key).load_full();
        let mut cur = head.as_deref();
        while let Some(b) = cur {
            if (self.compare)(&b.key, key) {
                return Some(b.value.clone());
            }
            cur = b.next.as_deref();
        }
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts only if `key` is absent. Returns whether it was inserted.
    pub fn add(&self, key: K, value: V) -> bool {
        self.insert_internal(key, value, false)
    }

    /// Inserts or replaces.
    pub fn replace(&self, key: K, value: V) -> bool {
        self.insert_internal(key, value, true)
    }

    fn insert_internal(&self, key: K, value: V, replace: bool) -> bool {
        let bucket = self.bucket(&key);
        loop {
            let head = bucket.load_full();
            let pos = self.position(&head, &key);
            let new_head = match pos {
                Some(_) if !replace => return false,
                Some(p) => Self::rebuild_prefix(&head, p, |old| {
                    Some(Arc::new(FcHashBucket {
                        key: key.clone(),
                        value: value.clone(),
                        next: old.next.clone(),
                    }))
                }),
                None => Some(Arc::new(FcHashBucket {
                    key: key.clone(),
                    value: value.clone(),
                    next: head.clone(),
                })),
            };
            let prev = bucket.compare_and_swap(&head, new_head);
            if same_head(&*prev, &head) {
                return true;
            }
        }
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let bucket = self.bucket(key);
        loop {
            let head = bucket.load_full();
            let Some(p) = self.position(&head, key) else {
                return false;
            };
            let new_head = Self::rebuild_prefix(&head, p, |old| old.next.clone());
            let prev = bucket.compare_and_swap(&head, new_head);
            if same_head(&*prev, &head) {
                return true;
            }
        }
    }

    fn position(&self, head: &Option<Arc<FcHashBucket<K, V>>>, key: &K) -> Option<usize> {
        let mut cur = head.as_deref();
        let mut i = 0;
        while let Some(b) = cur {
            if (self.compare)(&b.key, key) {
                return Some(i);
            }
            cur = b.next.as_deref();
            i += 1;
        }
        None
    }

    // Copies the first `pos` nodes so the chain can be changed at `pos`
    // without touching the published one; the tail after `pos` is shared.
    fn rebuild_prefix(
        head: &Option<Arc<FcHashBucket<K, V>>>,
        pos: usize,
        at: impl FnOnce(&FcHashBucket<K, V>) -> Option<Arc<FcHashBucket<K, V>>>,
    ) -> Option<Arc<FcHashBucket<K, V>>> {
        let mut prefix = Vec::with_capacity(pos);
        let mut cur = head.as_deref();
        for _ in 0..pos {
            let Some(b) = cur else { break };
            prefix.push(b);
            cur = b.next.as_deref();
        }
        let mut rebuilt = cur.and_then(at);
        for b in prefix.into_iter().rev() {
            rebuilt = Some(Arc::new(FcHashBucket {
                key: b.key.clone(),
                value: b.value.clone(),
                next: rebuilt,
            }));
        }
        rebuilt
    }

    /// Snapshot of all entries, bucket by bucket.
    pub fn entries(&self) -> Vec<(K, V)> {
        let mut out = Vec::new();
        for bucket in self.buckets.iter() {
            let head = bucket.load_full();
            let mut cur = head.as_deref();
            while let Some(b) = cur {
                out.push((b.key.clone(), b.value.clone()));
                cur = b.next.as_deref();
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.load().is_none())
    }
}
