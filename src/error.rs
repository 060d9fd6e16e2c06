//! Error types for table creation, insertion and continuation walks.

use core::fmt;
use std::collections::TryReserveError;

/// Errors returned by [`AssocTable`](crate::AssocTable) operations.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The bin array could not be allocated.
    ///
    /// Creation is all-or-nothing: no table exists when this is returned.
    #[error("out of memory allocating {bins} hash bins")]
    OutOfMemory { bins: usize },

    /// A continuation does not decode to a bin of this table.
    ///
    /// Either the raw value is negative or its bin index is not below the
    /// table's bin count, typically because the token came from a different
    /// table or was corrupted while stored.
    #[error("continuation {raw:#x} does not name a bin of this table")]
    BadContinuation { raw: i64 },
}

/// Allocation failure while linking a new entry.
///
/// Nothing was inserted; the key and value are handed back to the caller.
#[derive(thiserror::Error)]
#[error("out of memory linking a new entry")]
pub struct InsertError<K, V> {
    pub key: K,
    pub value: V,
    source: TryReserveError,
}

impl<K, V> InsertError<K, V> {
    pub(crate) fn new(key: K, value: V, source: TryReserveError) -> Self {
        Self { key, value, source }
    }

    /// Recover the key and value that were not inserted.
    pub fn into_inner(self) -> (K, V) {
        (self.key, self.value)
    }
}

// Keys and values need not be Debug.
impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
