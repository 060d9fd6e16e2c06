//! AssocTable: fixed-bin chained hash table routed through a [`Policy`].

use crate::continuation::POSITION_SPAN;
use crate::error::{Error, InsertError};
use crate::guard::CalloutGuard;
use crate::policy::{KeyPolicy, Policy, StrPolicy};
use core::borrow::Borrow;
use core::fmt;

/// Smallest bin count a table is created with.
pub const MIN_BINS: usize = 1;

/// Largest bin count a table is created with: every bin index must fit in a
/// [`Continuation`](crate::Continuation).
pub const MAX_BINS: usize = max_bins();

const fn max_bins() -> usize {
    let by_span = (i64::MAX / POSITION_SPAN) as u64;
    if by_span > usize::MAX as u64 {
        usize::MAX
    } else {
        by_span as usize
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// One bin's chain.
///
/// Stored tail-first: the chain head is the last element, so linking a new
/// head is a push and position `p` from the head is index `len - 1 - p`.
pub(crate) struct Chain<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K, V> Chain<K, V> {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry `position` steps from the head.
    #[inline]
    pub(crate) fn at(&self, position: usize) -> Option<(&K, &V)> {
        let idx = self.entries.len().checked_sub(position.checked_add(1)?)?;
        let e = &self.entries[idx];
        Some((&e.key, &e.value))
    }

    /// Head-to-tail.
    fn iter(&self) -> core::iter::Rev<core::slice::Iter<'_, Entry<K, V>>> {
        self.entries.iter().rev()
    }

    /// Storage index of the entry nearest the head whose key satisfies `hit`.
    fn find(&self, mut hit: impl FnMut(&K) -> bool) -> Option<usize> {
        self.entries.iter().rposition(|e| hit(&e.key))
    }

    fn try_push_head(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        if let Err(e) = self.entries.try_reserve(1) {
            return Err(InsertError::new(key, value, e));
        }
        self.entries.push(Entry { key, value });
        Ok(())
    }

    /// Unlink the entry at storage index `idx`, keeping the order of the rest.
    ///
    /// An emptied chain gives its storage back; a chain that still holds
    /// entries keeps its capacity.
    fn detach(&mut self, idx: usize) -> Entry<K, V> {
        let entry = self.entries.remove(idx);
        if self.entries.is_empty() {
            self.entries = Vec::new();
        }
        entry
    }

    fn pop_head(&mut self) -> Option<Entry<K, V>> {
        self.entries.pop()
    }
}

/// A hash table with a fixed number of bins, each holding a chain of
/// entries with the newest at its head.
///
/// Keys and values are owned by the table from a successful
/// [`insert`](Self::insert) until [`remove`](Self::remove) or drop, at which
/// point they are handed to the policy's destroy functions exactly once.
/// The default value is returned by [`lookup`](Self::lookup) on a miss; it is
/// never passed to `destroy_value`.
///
/// Keys are not de-duplicated. Inserting a key that is already present adds
/// a second entry in front of the first; lookups see the newest one and
/// `remove` takes the newest one first.
pub struct AssocTable<K, V, P = StrPolicy>
where
    P: Policy<K, V>,
{
    pub(crate) bins: Vec<Chain<K, V>>,
    count: usize,
    default_value: V,
    policy: P,
    guard: CalloutGuard,
}

impl<K, V> AssocTable<K, V, StrPolicy>
where
    K: AsRef<[u8]>,
{
    /// Create a table with the byte-string policy.
    pub fn new(default_value: V, bin_count_hint: usize) -> Result<Self, Error> {
        Self::create(default_value, bin_count_hint, StrPolicy)
    }
}

impl<K, V, P> AssocTable<K, V, P>
where
    P: Policy<K, V>,
{
    /// Create a table.
    ///
    /// `bin_count_hint` is clamped into `[MIN_BINS, MAX_BINS]`; the result is
    /// the table's bin count for its whole life. Fails without building
    /// anything if the bin array cannot be allocated.
    pub fn create(default_value: V, bin_count_hint: usize, policy: P) -> Result<Self, Error> {
        let bin_count = bin_count_hint.clamp(MIN_BINS, MAX_BINS);
        let mut bins = Vec::new();
        bins.try_reserve_exact(bin_count)
            .map_err(|_| Error::OutOfMemory { bins: bin_count })?;
        bins.resize_with(bin_count, Chain::new);
        Ok(Self {
            bins,
            count: 0,
            default_value,
            policy,
            guard: CalloutGuard::new(),
        })
    }

    /// Destroy the table, releasing every remaining key and value through the
    /// policy. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self)
    }

    #[inline]
    fn bin_of<Q>(&self, key: &Q) -> usize
    where
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        <P as KeyPolicy<Q>>::hash(&self.policy, key) as usize % self.bins.len()
    }

    /// The value stored under `key`, or `None`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        let _g = self.guard.enter();
        let chain = &self.bins[self.bin_of(key)];
        chain
            .iter()
            .find(|e| <P as KeyPolicy<Q>>::compare(&self.policy, e.key.borrow(), key))
            .map(|e| &e.value)
    }

    /// The value stored under `key`, or the table's default value.
    pub fn lookup<Q>(&self, key: &Q) -> &V
    where
        K: Borrow<Q>,
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        self.get(key).unwrap_or(&self.default_value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        self.get(key).is_some()
    }

    /// Link `key -> value` at the head of its bin's chain.
    ///
    /// On allocation failure nothing is linked and the key and value come
    /// back inside the error.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        let _g = self.guard.enter();
        let bin = self.bin_of(&key);
        self.bins[bin].try_push_head(key, value)?;
        self.count += 1;
        Ok(())
    }

    /// Unlink the newest entry for `key` and hand it back without destroying
    /// it.
    pub fn take<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        let _g = self.guard.enter();
        let bin = self.bin_of(key);
        let policy = &self.policy;
        let chain = &mut self.bins[bin];
        let idx = chain.find(|k| <P as KeyPolicy<Q>>::compare(policy, k.borrow(), key))?;
        let Entry { key, value } = chain.detach(idx);
        self.count -= 1;
        Some((key, value))
    }

    /// Unlink the newest entry for `key` and release its key and value
    /// through the policy. Does nothing when the key is absent.
    pub fn remove<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        P: KeyPolicy<Q>,
    {
        // The chain is consistent again before any destroy function runs.
        if let Some((k, v)) = self.take(key) {
            self.policy.destroy_key(k);
            self.policy.destroy_value(v);
        }
    }

    /// Number of stored entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn default_value(&self) -> &V {
        &self.default_value
    }

    /// Call `f` for every entry, bins in ascending order and each chain from
    /// head to tail. The first `Err` stops the walk and is returned.
    pub fn walk<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&K, &V) -> Result<(), E>,
    {
        for (k, v) in self.iter() {
            f(k, v)?;
        }
        Ok(())
    }

    /// Iterate in the same order as [`walk`](Self::walk).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            bins: self.bins.iter(),
            chain: <&[Entry<K, V>]>::default().iter().rev(),
            remaining: self.count,
        }
    }

    /// Per-bin chain lengths, in bin order.
    #[cfg(feature = "bench_internal")]
    pub fn chain_lengths(&self) -> Vec<usize> {
        self.bins.iter().map(Chain::len).collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut total = 0;
        for (bin, chain) in self.bins.iter().enumerate() {
            for e in chain.iter() {
                assert_eq!(self.bin_of(&e.key), bin, "entry stored in the wrong bin");
            }
            total += chain.len();
        }
        assert_eq!(total, self.count, "count out of step with chains");
    }
}

impl<K, V, P> Drop for AssocTable<K, V, P>
where
    P: Policy<K, V>,
{
    fn drop(&mut self) {
        for chain in self.bins.iter_mut() {
            while let Some(Entry { key, value }) = chain.pop_head() {
                self.count -= 1;
                self.policy.destroy_key(key);
                self.policy.destroy_value(value);
            }
        }
        debug_assert_eq!(self.count, 0);
    }
}

impl<K, V, P> fmt::Debug for AssocTable<K, V, P>
where
    P: Policy<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lengths: Vec<usize> = self.bins.iter().map(Chain::len).collect();
        f.debug_struct("AssocTable")
            .field("bin_count", &self.bins.len())
            .field("count", &self.count)
            .field("chain_lengths", &lengths)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(&K, &V)` in walk order.
pub struct Iter<'a, K, V> {
    bins: core::slice::Iter<'a, Chain<K, V>>,
    chain: core::iter::Rev<core::slice::Iter<'a, Entry<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            self.chain = self.bins.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V, P> IntoIterator for &'a AssocTable<K, V, P>
where
    P: Policy<K, V>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
