//! Resumable walks driven by a plain integer continuation.
//!
//! A [`Continuation`] packs a bin index and a position (steps from the chain
//! head) into one `i64`:
//!
//! ```text
//! raw = bin * POSITION_SPAN + position
//! ```
//!
//! The table keeps no cursor state. Each call to
//! [`AssocTable::walk_continuation`] decodes the token, walks to the entry it
//! names and returns that entry with the token for the next one. Between
//! calls the caller holds nothing but the integer, so it can store it, pass
//! it around, and mutate the table in the meantime.
//!
//! Positions are offsets, not identities. Removing or inserting entries
//! nearer the head of a chain than the stored position shifts which entry
//! the position names, so a walk that resumes after such a change may skip
//! or revisit entries.

use crate::assoc_table::{AssocTable, Chain};
use crate::error::Error;
use crate::policy::Policy;

/// Number of positions reserved per bin in a continuation.
///
/// A chain reaching this length cannot be walked by continuation; that is a
/// usage defect and encoding panics rather than returning an error.
pub const POSITION_SPAN: i64 = 1 << 24;

/// Opaque resume point for [`AssocTable::walk_continuation`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Continuation(i64);

impl Continuation {
    /// Start of the table.
    pub const START: Continuation = Continuation(0);

    pub const fn from_raw(raw: i64) -> Self {
        Continuation(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub(crate) fn encode(bin: usize, position: usize) -> Self {
        assert!(
            (position as u64) < POSITION_SPAN as u64,
            "chain position {position} does not fit in a continuation"
        );
        Continuation(bin as i64 * POSITION_SPAN + position as i64)
    }

    /// `(bin, position)`, or `None` for a negative raw value.
    pub(crate) fn decode(self) -> Option<(usize, usize)> {
        if self.0 < 0 {
            return None;
        }
        let bin = usize::try_from(self.0 / POSITION_SPAN).ok()?;
        Some((bin, (self.0 % POSITION_SPAN) as usize))
    }
}

impl From<i64> for Continuation {
    fn from(raw: i64) -> Self {
        Continuation(raw)
    }
}

impl From<Continuation> for i64 {
    fn from(c: Continuation) -> Self {
        c.0
    }
}

/// Outcome of one [`AssocTable::walk_continuation`] call.
#[derive(Debug, Eq, PartialEq)]
pub enum Step<'a, K, V> {
    /// The entry at the continuation, and where to resume for the next one.
    Item {
        key: &'a K,
        value: &'a V,
        next: Continuation,
    },
    /// Nothing remains at or after the continuation.
    End,
}

fn first_occupied<K, V>(bins: &[Chain<K, V>], from: usize) -> Option<usize> {
    bins.get(from..)?
        .iter()
        .position(|c| !c.is_empty())
        .map(|i| from + i)
}

impl<K, V, P> AssocTable<K, V, P>
where
    P: Policy<K, V>,
{
    /// Return the entry named by `continuation` and the continuation of the
    /// entry after it.
    ///
    /// Start with [`Continuation::START`] and feed each returned `next` back
    /// in until [`Step::End`]. Visiting order is the same as
    /// [`walk`](Self::walk). If the named position has fallen off the end of
    /// its chain the walk resumes at the next non-empty bin.
    ///
    /// Fails with [`Error::BadContinuation`] when the token is negative or
    /// its bin is not below [`bin_count`](Self::bin_count).
    pub fn walk_continuation(&self, continuation: Continuation) -> Result<Step<'_, K, V>, Error> {
        let bins = &self.bins[..];
        let (bin, position) = continuation
            .decode()
            .filter(|&(bin, _)| bin < bins.len())
            .ok_or(Error::BadContinuation {
                raw: continuation.raw(),
            })?;

        let (bin, position) = if position < bins[bin].len() {
            (bin, position)
        } else {
            match first_occupied(bins, bin + 1) {
                Some(b) => (b, 0),
                None => return Ok(Step::End),
            }
        };
        let Some((key, value)) = bins[bin].at(position) else {
            return Ok(Step::End);
        };

        let next = if position + 1 < bins[bin].len() {
            Continuation::encode(bin, position + 1)
        } else {
            match first_occupied(bins, bin + 1) {
                Some(b) => Continuation::encode(b, 0),
                // Decodes in range and yields End on the next call.
                None => Continuation::encode(bin, position + 1),
            }
        };
        Ok(Step::Item { key, value, next })
    }
}
