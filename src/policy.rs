//! Policies: how keys are hashed and compared, and how keys and values are
//! released once the table lets go of them.
//!
//! A policy is split in two traits so that lookups can be made with a
//! borrowed form of the key (`&str` for a `String` key, `&[u8]` for a
//! `Vec<u8>` key):
//! - [`KeyPolicy<Q>`] hashes and compares keys seen as `Q`;
//! - [`Policy<K, V>`] adds the destroy functions for owned keys and values.
//!
//! As with `Borrow`, a policy that implements `KeyPolicy` for both `K` and a
//! borrowed `Q` must hash and compare both forms identically.

use core::fmt;
use core::hash::{BuildHasher, Hash};
use foldhash::fast::FixedState;
use hashbrown::hash_map::DefaultHashBuilder;

const BYTES_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Hash a byte string the way the default policies do.
///
/// The seed is fixed, so a key lands in the same bin in every table with the
/// same bin count.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    fold(FixedState::with_seed(BYTES_SEED).hash_one(bytes))
}

#[inline]
fn fold(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Hashing and comparison of keys viewed as `Q`.
pub trait KeyPolicy<Q: ?Sized> {
    /// Hash `key`. The table reduces this modulo its bin count.
    fn hash(&self, key: &Q) -> u32;

    /// Returns true when `a` and `b` name the same key.
    fn compare(&self, a: &Q, b: &Q) -> bool;
}

/// Full policy set for a table storing `K -> V`.
///
/// The destroy functions receive ownership of a key or value the table is
/// discarding (on `remove` and when the table is dropped). The defaults just
/// drop it.
pub trait Policy<K, V>: KeyPolicy<K> {
    fn destroy_key(&self, key: K) {
        drop(key);
    }

    fn destroy_value(&self, value: V) {
        drop(value);
    }
}

/// No-op destroy function for keys that need no cleanup because something
/// else owns what they refer to. The key is forgotten, not dropped.
pub fn no_destroy_key<K>(key: K) {
    core::mem::forget(key);
}

/// No-op destroy function for values, see [`no_destroy_key`].
pub fn no_destroy_value<V>(value: V) {
    core::mem::forget(value);
}

/// Byte-string policy: hash and compare over the key's bytes, drop on
/// destroy. This is the table's default policy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StrPolicy;

impl<Q> KeyPolicy<Q> for StrPolicy
where
    Q: ?Sized + AsRef<[u8]>,
{
    #[inline]
    fn hash(&self, key: &Q) -> u32 {
        hash_bytes(key.as_ref())
    }

    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> bool {
        a.as_ref() == b.as_ref()
    }
}

impl<K, V> Policy<K, V> for StrPolicy where K: AsRef<[u8]> {}

/// Policy for any `K: Hash + Eq`, hashing through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct HashedPolicy<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> HashedPolicy<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<Q, S> KeyPolicy<Q> for HashedPolicy<S>
where
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &Q) -> u32 {
        fold(self.hasher.hash_one(key))
    }

    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> bool {
        a == b
    }
}

impl<K, V, S> Policy<K, V> for HashedPolicy<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
}

/// A policy assembled from four plain functions.
///
/// Start from [`FnPolicy::new`], which fills every omitted function with the
/// byte-string default, or from [`FnPolicy::from_fns`] for keys that are not
/// byte strings; then override individual functions with the `with_*`
/// builders.
pub struct FnPolicy<K, V> {
    hash: fn(&K) -> u32,
    compare: fn(&K, &K) -> bool,
    destroy_key: fn(K),
    destroy_value: fn(V),
}

fn bytes_hash<K: AsRef<[u8]>>(key: &K) -> u32 {
    hash_bytes(key.as_ref())
}

fn bytes_compare<K: AsRef<[u8]>>(a: &K, b: &K) -> bool {
    a.as_ref() == b.as_ref()
}

impl<K, V> FnPolicy<K, V>
where
    K: AsRef<[u8]>,
{
    /// Build a policy from optional functions; each `None` is replaced by the
    /// byte-string default (hash/compare over the key bytes, drop on destroy).
    pub fn new(
        hash: Option<fn(&K) -> u32>,
        compare: Option<fn(&K, &K) -> bool>,
        destroy_key: Option<fn(K)>,
        destroy_value: Option<fn(V)>,
    ) -> Self {
        Self {
            hash: hash.unwrap_or(bytes_hash::<K>),
            compare: compare.unwrap_or(bytes_compare::<K>),
            destroy_key: destroy_key.unwrap_or(drop::<K>),
            destroy_value: destroy_value.unwrap_or(drop::<V>),
        }
    }

    /// All byte-string defaults.
    pub fn strings() -> Self {
        Self::new(None, None, None, None)
    }
}

impl<K, V> FnPolicy<K, V> {
    /// Policy with the given hash and compare functions; destroy drops.
    pub fn from_fns(hash: fn(&K) -> u32, compare: fn(&K, &K) -> bool) -> Self {
        Self {
            hash,
            compare,
            destroy_key: drop::<K>,
            destroy_value: drop::<V>,
        }
    }

    pub fn with_hash(self, hash: fn(&K) -> u32) -> Self {
        Self { hash, ..self }
    }

    pub fn with_compare(self, compare: fn(&K, &K) -> bool) -> Self {
        Self { compare, ..self }
    }

    pub fn with_destroy_key(self, destroy_key: fn(K)) -> Self {
        Self { destroy_key, ..self }
    }

    pub fn with_destroy_value(self, destroy_value: fn(V)) -> Self {
        Self {
            destroy_value,
            ..self
        }
    }
}

impl<K, V> Clone for FnPolicy<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for FnPolicy<K, V> {}

impl<K, V> fmt::Debug for FnPolicy<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

impl<K, V> KeyPolicy<K> for FnPolicy<K, V> {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    #[inline]
    fn compare(&self, a: &K, b: &K) -> bool {
        (self.compare)(a, b)
    }
}

impl<K, V> Policy<K, V> for FnPolicy<K, V> {
    fn destroy_key(&self, key: K) {
        (self.destroy_key)(key)
    }

    fn destroy_value(&self, value: V) {
        (self.destroy_value)(value)
    }
}
