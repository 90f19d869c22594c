//! `ConcurrentSet` — a lock-striped hash multiset.
//!
//! The table is fixed at construction: a power-of-two number of buckets, each a chain
//! behind its own cache-padded mutex. Single-element operations lock exactly one
//! bucket; whole-table operations visit the buckets in index order, one lock at a
//! time, so they are not atomic with respect to concurrent writers.
//!
//! Equal elements are not collapsed: `add` always inserts, `remove` takes out one
//! occurrence and [`purge`](ConcurrentSet::purge) takes out all of them.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// Number of buckets used by [`ConcurrentSet::new`].
pub const DEFAULT_TABLE_SIZE: usize = 32;

/// A thread-safe hash multiset with one lock per bucket.
pub struct ConcurrentSet<T, S = RandomState> {
    /// Each chain keeps insertion order; the newest element is last.
    buckets: Box<[CachePadded<Mutex<Vec<T>>>]>,
    hasher: S,
}

impl<T: Hash + Eq> ConcurrentSet<T> {
    /// Creates a set with [`DEFAULT_TABLE_SIZE`] buckets.
    pub fn new() -> Self {
        Self::with_table_size(DEFAULT_TABLE_SIZE)
    }

    /// Creates a set with at least `min_table_size` buckets, rounded up to a power of two.
    pub fn with_table_size(min_table_size: usize) -> Self {
        Self::with_table_size_and_hasher(min_table_size, RandomState::new())
    }
}

impl<T: Hash + Eq> Default for ConcurrentSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq, S: BuildHasher> ConcurrentSet<T, S> {
    /// Creates a set with [`DEFAULT_TABLE_SIZE`] buckets using `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_table_size_and_hasher(DEFAULT_TABLE_SIZE, hasher)
    }

    /// Creates a set with at least `min_table_size` buckets using `hasher`.
    pub fn with_table_size_and_hasher(min_table_size: usize, hasher: S) -> Self {
        let size = min_table_size.max(1).next_power_of_two();
        let buckets = (0..size)
            .map(|_| CachePadded::new(Mutex::new(Vec::new())))
            .collect();
        Self { buckets, hasher }
    }

    /// Number of buckets. Fixed for the life of the set.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// The hasher used to place elements.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    fn bucket<Q: Hash + ?Sized>(&self, value: &Q) -> &Mutex<Vec<T>> {
        // Truncation is fine: only the low bits pick the bucket.
        #[allow(clippy::cast_possible_truncation)]
        let hash = self.hasher.hash_one(value) as usize;
        &self.buckets[hash & (self.buckets.len() - 1)]
    }

    /// Inserts `value`, even if an equal element is present. Always returns `true`.
    pub fn add(&self, value: T) -> bool {
        self.bucket(&value).lock().push(value);
        true
    }

    /// Inserts every element of `values`. Returns `true` if anything was inserted.
    pub fn add_all<I: IntoIterator<Item = T>>(&self, values: I) -> bool {
        values.into_iter().fold(false, |added, value| self.add(value) | added)
    }

    /// Returns `true` if an element equal to `value` is present.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.bucket(value).lock().iter().any(|e| e.borrow() == value)
    }

    /// Returns `true` if every element of `values` is present.
    pub fn contains_all<'a, Q, I>(&self, values: I) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        values.into_iter().all(|value| self.contains(value))
    }

    /// Removes one element equal to `value`, the most recently added one. Returns
    /// `false` if there was none.
    pub fn remove<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut chain = self.bucket(value).lock();
        match chain.iter().rposition(|e| e.borrow() == value) {
            Some(index) => {
                chain.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes one occurrence of each element of `values`. Returns `true` if anything
    /// was removed.
    pub fn remove_all<'a, Q, I>(&self, values: I) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        values.into_iter().fold(false, |removed, value| self.remove(value) | removed)
    }

    /// Removes every element equal to `value` and returns how many there were.
    ///
    /// Repeats [`remove`](Self::remove) until it finds nothing, so an equal element
    /// added concurrently may be removed as well.
    pub fn purge<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut removed = 0;
        while self.remove(value) {
            removed += 1;
        }
        removed
    }

    /// Keeps only the elements for which `keep` returns `true`. Returns `true` if
    /// anything was removed.
    pub fn retain<F: FnMut(&T) -> bool>(&self, mut keep: F) -> bool {
        let mut removed = false;
        for bucket in self.buckets.iter() {
            let mut chain = bucket.lock();
            let before = chain.len();
            chain.retain(|e| keep(e));
            removed |= chain.len() != before;
        }
        removed
    }

    /// Keeps only the elements that `other` contains. Returns `true` if anything was
    /// removed.
    pub fn retain_all<C: ?Sized + Contains<T>>(&self, other: &C) -> bool {
        self.retain(|e| other.contains_element(e))
    }

    /// Removes every element.
    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            bucket.lock().clear();
        }
    }

    /// Number of elements. Walks the whole table.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.lock().len()).sum()
    }

    /// Returns `true` if no bucket holds an element. Walks the whole table.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.lock().is_empty())
    }

    /// Copies the elements out, bucket by bucket, newest first within a bucket.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut elements = Vec::with_capacity(self.capacity());
        for bucket in self.buckets.iter() {
            elements.extend(bucket.lock().iter().rev().cloned());
        }
        elements
    }

    /// Iterates over a snapshot taken by [`to_vec`](Self::to_vec). Later changes to
    /// the set are not reflected.
    pub fn iter(&self) -> std::vec::IntoIter<T>
    where
        T: Clone,
    {
        self.to_vec().into_iter()
    }
}

/// Membership test used by [`ConcurrentSet::retain_all`].
pub trait Contains<T> {
    /// Returns `true` if `value` is a member.
    fn contains_element(&self, value: &T) -> bool;
}

impl<T: PartialEq> Contains<T> for [T] {
    fn contains_element(&self, value: &T) -> bool {
        self.contains(value)
    }
}

impl<T: Hash + Eq, S: BuildHasher> Contains<T> for std::collections::HashSet<T, S> {
    fn contains_element(&self, value: &T) -> bool {
        self.contains(value)
    }
}

impl<T: Hash + Eq, S: BuildHasher> Contains<T> for ConcurrentSet<T, S> {
    fn contains_element(&self, value: &T) -> bool {
        self.contains(value)
    }
}

impl<T: Hash + Eq, S: BuildHasher> Extend<T> for ConcurrentSet<T, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<T: Hash + Eq, S: BuildHasher + Default> FromIterator<T> for ConcurrentSet<T, S> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let set = Self::with_hasher(S::default());
        set.add_all(iter);
        set
    }
}

impl<T: core::fmt::Debug, S> core::fmt::Debug for ConcurrentSet<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut set = f.debug_set();
        for bucket in self.buckets.iter() {
            set.entries(bucket.lock().iter().rev());
        }
        set.finish()
    }
}
