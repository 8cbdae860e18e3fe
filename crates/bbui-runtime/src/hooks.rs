#![forbid(unsafe_code)]

//! Instance-scoped data hooks.
//!
//! A [`RenderCx`] is handed to a component for the duration of one render. It
//! walks the instance's hook slots in call order, creating a slot the first
//! time a position is reached and reusing it on every later render.

use std::any::{Any, type_name};

use bbui_data::{
    AccessorSlot, Closable, DepValue, DynamicQuery, Result as DataResult, Session, StaticQuery,
};

use crate::component::ComponentId;
use crate::error::RuntimeError;

/// Render-time view of one component instance.
pub struct RenderCx<'a, S: Session> {
    pub(crate) id: ComponentId,
    pub(crate) session: &'a S,
    pub(crate) hooks: &'a mut Vec<Box<dyn Any>>,
    pub(crate) cursor: usize,
    /// New slots may only be appended until the first successful render.
    pub(crate) allow_growth: bool,
}

impl<'a, S> RenderCx<'a, S>
where
    S: Session,
    S::Handle: Clone + 'static,
{
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[must_use]
    pub fn session(&self) -> &'a S {
        self.session
    }

    /// Number of hooks called so far in this render.
    #[must_use]
    pub fn hooks_called(&self) -> usize {
        self.cursor
    }

    /// The instance's subscription handle.
    ///
    /// Opened on the first call at this position and reused on every later
    /// render; released when the instance is unmounted. If opening fails the
    /// error is returned and the next render tries again.
    pub fn use_accessor(&mut self) -> Result<S::Handle, RuntimeError> {
        let session = self.session;
        let slot = self.slot::<AccessorSlot<S::Handle>>()?;
        Ok(slot.acquire(session)?.clone())
    }

    /// Run `fetch` once for this instance and return its result on every
    /// render.
    pub fn use_query<C>(&mut self, fetch: impl FnOnce() -> DataResult<C>) -> Result<C, RuntimeError>
    where
        C: Clone + 'static,
    {
        let slot = self.slot::<StaticQuery<C>>()?;
        Ok(slot.try_get_or_fetch(fetch)?.clone())
    }

    /// Return the result cached for `deps`, running `fetch` when `deps`
    /// differs by value from the previous render's vector.
    ///
    /// The previously returned collection is closed once the new one has been
    /// fetched. A failed fetch keeps the previous collection open and cached.
    pub fn use_dynamic_query<C>(
        &mut self,
        deps: &[DepValue],
        fetch: impl FnOnce() -> DataResult<C>,
    ) -> Result<C, RuntimeError>
    where
        C: Closable + Clone + 'static,
    {
        let slot = self.slot::<DynamicQuery<C>>()?;
        Ok(slot.try_get_or_refetch(deps, fetch)?.clone())
    }

    fn slot<T: Default + 'static>(&mut self) -> Result<&mut T, RuntimeError> {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.hooks.len() {
            if !self.allow_growth {
                return Err(RuntimeError::HookCountChanged {
                    component: self.id,
                    expected: self.hooks.len(),
                    actual: index + 1,
                });
            }
            self.hooks.push(Box::new(T::default()));
        }
        self.hooks[index]
            .downcast_mut::<T>()
            .ok_or(RuntimeError::HookOrder {
                component: self.id,
                index,
                expected: type_name::<T>(),
            })
    }
}
