//! assoc-table: a fixed-bin chained hash table with caller-supplied
//! policies and a resumable walk driven by a plain integer continuation.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an associative array whose hashing, key comparison and
//!   key/value release are supplied by the caller, and whose contents can
//!   be walked across many separate calls without holding an iterator.
//! - Layers:
//!   - `Policy<K, V>` / `KeyPolicy<Q>`: the capability set the table is
//!     generic over (hash, compare, destroy key, destroy value). Statically
//!     dispatched; `StrPolicy`, `HashedPolicy` and the function-pointer
//!     `FnPolicy` are provided.
//!   - `AssocTable<K, V, P>`: a fixed array of bins, each a chain of
//!     entries with the newest at the head. Insert, remove and drop route
//!     owned keys/values through the policy.
//!   - `Continuation`: an `i64` naming `(bin, position)`; the walk protocol
//!     decodes it, returns the entry there and the token for the next one.
//!
//! Constraints
//! - Single-threaded: no locks or atomics. The table is `!Sync`.
//! - The bin count is chosen once at creation; there is no rehashing.
//! - Keys are not de-duplicated. A repeated key shadows the older entry.
//! - Lookup and remove never allocate; insert reserves room for one entry
//!   (amortized, moving its chain when the chain is full) and reports
//!   allocation failure instead of aborting. A chain emptied by removal
//!   gives its storage back.
//!
//! Ownership
//! - `insert` moves key and value into the table on success and hands both
//!   back inside `InsertError` on failure.
//! - `remove` and drop pass each key to `destroy_key` and each value to
//!   `destroy_value` exactly once. The default value is never destroyed
//!   through the policy.
//! - `take` unlinks an entry and returns it without calling the policy.
//!
//! Reentrancy
//! - Methods that call into policy code hold a debug-only callout guard
//!   while chain state is in use; a policy reaching back into the same
//!   table panics in debug builds. Destroy functions run after the entry is
//!   unlinked, with the guard released.
//!
//! Continuations
//! - `raw = bin * POSITION_SPAN + position`, `POSITION_SPAN = 2^24`.
//! - Negative tokens and tokens whose bin is not below the bin count are
//!   rejected with `Error::BadContinuation`; the end of a walk is
//!   `Step::End`, not an error.
//! - A token carries no identity. Mutation between calls may make a walk
//!   skip or revisit entries; to remove the entry just returned, remove it
//!   and resume with the same token that produced it.

mod assoc_table;
mod assoc_table_proptest;
pub mod continuation;
mod error;
mod guard;
pub mod policy;

// Public surface
pub use assoc_table::{AssocTable, Iter, MAX_BINS, MIN_BINS};
pub use continuation::{Continuation, Step, POSITION_SPAN};
pub use error::{Error, InsertError};
pub use policy::{
    hash_bytes, no_destroy_key, no_destroy_value, FnPolicy, HashedPolicy, KeyPolicy, Policy,
    StrPolicy,
};
