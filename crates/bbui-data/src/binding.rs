#![forbid(unsafe_code)]

//! Component-scoped binding primitives.
//!
//! Each primitive is a slot owned by exactly one component instance and kept
//! alive across its re-renders:
//!
//! - [`AccessorSlot`] opens one subscription handle on first use and closes it
//!   when released or dropped.
//! - [`StaticQuery`] runs its fetch once and keeps the result forever.
//! - [`DynamicQuery`] keeps the result of its last fetch together with the
//!   [`DependencyVector`] that produced it, and refetches when a call supplies
//!   a vector that differs by value.
//!
//! # Invariants
//!
//! 1. An `AccessorSlot` closes every handle it opened exactly once.
//! 2. A `StaticQuery` calls its fetch at most once after a successful fetch.
//! 3. A `DynamicQuery` entry is replaced as a unit (key and value together);
//!    the value returned always belongs to the key last supplied by a
//!    successful call.
//! 4. A value displaced from a `DynamicQuery` is closed exactly once, after
//!    its replacement was obtained.
//!
//! # Failure Modes
//!
//! - **Open fails**: the error is returned and the slot stays empty; the next
//!   acquire tries again.
//! - **Fetch fails**: nothing is stored or closed. A `DynamicQuery` keeps its
//!   previous entry, so a later call with the previous key is a cache hit.
//! - **Fetch panics**: as above; the previous entry is untouched because the
//!   swap happens only after the fetch returns.

use std::convert::Infallible;
use std::fmt;

use tracing::{debug, trace};

use crate::dependency::{DepValue, DependencyVector};
use crate::error::Result;
use crate::session::{Closable, Session, SubscriptionHandle};

/// Holds the one subscription handle owned by a component instance.
///
/// Dropping the slot releases the handle, so tying the slot to the
/// component's storage ties the subscription to the component's lifetime.
pub struct AccessorSlot<H: SubscriptionHandle> {
    handle: Option<H>,
    opened: u64,
}

impl<H: SubscriptionHandle> Default for AccessorSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SubscriptionHandle> fmt::Debug for AccessorSlot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorSlot")
            .field("handle", &self.handle.as_ref().map(SubscriptionHandle::id))
            .field("opened", &self.opened)
            .finish()
    }
}

impl<H: SubscriptionHandle> AccessorSlot<H> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handle: None,
            opened: 0,
        }
    }

    /// Return the held handle, opening one from `session` if the slot is
    /// empty.
    pub fn acquire<S>(&mut self, session: &S) -> Result<&H>
    where
        S: Session<Handle = H>,
    {
        let handle = match self.handle {
            Some(ref handle) => handle,
            None => {
                let handle = session.open()?;
                self.opened += 1;
                debug!(handle = handle.id(), "accessor acquired");
                &*self.handle.insert(handle)
            }
        };
        Ok(handle)
    }

    /// Close and forget the held handle. Returns `false` if the slot was
    /// already empty, which makes repeated teardown harmless.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.close();
                debug!(handle = handle.id(), "accessor released");
                true
            }
            None => {
                trace!("accessor release on empty slot");
                false
            }
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of handles this slot has opened over its lifetime.
    #[must_use]
    pub fn times_opened(&self) -> u64 {
        self.opened
    }
}

impl<H: SubscriptionHandle> Drop for AccessorSlot<H> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Memoizes one fetch for the lifetime of a component instance.
///
/// The stored value is never closed here; whoever owns the subscription it
/// came from is responsible for that.
pub struct StaticQuery<C> {
    value: Option<C>,
}

impl<C> Default for StaticQuery<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: fmt::Debug> fmt::Debug for StaticQuery<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticQuery")
            .field("value", &self.value)
            .finish()
    }
}

impl<C> StaticQuery<C> {
    #[must_use]
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Return the stored value, running `fetch` only if nothing is stored.
    pub fn get_or_fetch(&mut self, fetch: impl FnOnce() -> C) -> &C {
        match self.try_get_or_fetch(|| Ok::<C, Infallible>(fetch())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`get_or_fetch`](Self::get_or_fetch). On error nothing
    /// is stored and the next call fetches again.
    pub fn try_get_or_fetch<E>(
        &mut self,
        fetch: impl FnOnce() -> std::result::Result<C, E>,
    ) -> std::result::Result<&C, E> {
        let value = match self.value {
            Some(ref value) => value,
            None => {
                let value = fetch()?;
                trace!("static query populated");
                &*self.value.insert(value)
            }
        };
        Ok(value)
    }

    #[must_use]
    pub fn get(&self) -> Option<&C> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.value.is_some()
    }
}

struct CacheEntry<C> {
    deps: DependencyVector,
    value: C,
}

/// Memoizes a fetch keyed by a [`DependencyVector`].
///
/// Dropping the cache does not close the held value: collections fetched
/// through an accessor are closed together with it.
pub struct DynamicQuery<C: Closable> {
    entry: Option<CacheEntry<C>>,
    fetches: u64,
}

impl<C: Closable> Default for DynamicQuery<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Closable> fmt::Debug for DynamicQuery<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicQuery")
            .field("deps", &self.entry.as_ref().map(|e| &e.deps))
            .field("fetches", &self.fetches)
            .finish()
    }
}

impl<C: Closable> DynamicQuery<C> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entry: None,
            fetches: 0,
        }
    }

    /// Return the value cached for `deps`, refetching if the slot is empty or
    /// `deps` differs by value from the stored key.
    pub fn get_or_refetch(&mut self, deps: &[DepValue], fetch: impl FnOnce() -> C) -> &C {
        match self.try_get_or_refetch(deps, || Ok::<C, Infallible>(fetch())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`get_or_refetch`](Self::get_or_refetch).
    ///
    /// On a key change the replacement is fetched first; only then is the
    /// entry swapped and the previous value closed. A failed fetch leaves the
    /// previous entry in place and open.
    pub fn try_get_or_refetch<E>(
        &mut self,
        deps: &[DepValue],
        fetch: impl FnOnce() -> std::result::Result<C, E>,
    ) -> std::result::Result<&C, E> {
        let entry = match self.entry {
            Some(ref mut entry) => {
                if entry.deps != *deps {
                    let value = fetch()?;
                    self.fetches += 1;
                    let fresh = CacheEntry {
                        deps: DependencyVector::from(deps),
                        value,
                    };
                    let stale = std::mem::replace(entry, fresh);
                    stale.value.close();
                    debug!(
                        from = %stale.deps,
                        to = %entry.deps,
                        "dependencies changed, previous result closed"
                    );
                } else {
                    trace!(deps = %entry.deps, "dynamic query hit");
                }
                entry
            }
            None => {
                let value = fetch()?;
                self.fetches += 1;
                let deps = DependencyVector::from(deps);
                debug!(deps = %deps, "dynamic query populated");
                self.entry.insert(CacheEntry { deps, value })
            }
        };
        Ok(&entry.value)
    }

    #[must_use]
    pub fn get(&self) -> Option<&C> {
        self.entry.as_ref().map(|e| &e.value)
    }

    /// Key of the stored value.
    #[must_use]
    pub fn deps(&self) -> Option<&DependencyVector> {
        self.entry.as_ref().map(|e| &e.deps)
    }

    /// Number of successful fetches over the cache's lifetime.
    #[must_use]
    pub fn fetches(&self) -> u64 {
        self.fetches
    }
}
