//! Debug-only guard around policy callouts.
//!
//! While the table hashes or compares keys it is partway through a chain
//! search or edit. A policy that reaches back into the same table at that
//! point (through a raw pointer or shared interior state) would see the
//! chain mid-operation. Debug builds panic on such nesting; release builds
//! keep no state and the guard compiles away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table callout tracker. Methods that call into policy code start with
/// `let _g = self.guard.enter();`.
#[derive(Debug)]
pub(crate) struct CalloutGuard {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // !Sync in every build profile, not only when `busy` exists.
    _not_sync: PhantomData<Cell<()>>,
}

impl CalloutGuard {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _not_sync: PhantomData,
        }
    }

    /// Mark the table busy until the returned value is dropped.
    ///
    /// Panics in debug builds when the table is already busy.
    #[inline]
    pub(crate) fn enter(&self) -> Callout<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "policy callout re-entered the table it was called from"
            );
            Callout { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Callout { _owner: PhantomData }
        }
    }
}

/// Scope of one guarded section.
pub(crate) struct Callout<'a> {
    #[cfg(debug_assertions)]
    owner: &'a CalloutGuard,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a CalloutGuard>,
}

impl Drop for Callout<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let was_busy = self.owner.busy.replace(false);
            debug_assert!(was_busy);
        }
    }
}
