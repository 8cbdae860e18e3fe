#![forbid(unsafe_code)]

//! Component instances and their hook storage.
//!
//! # Failure Modes
//!
//! - **Render error**: slots created before the error are kept. The instance
//!   is not marked settled until a render succeeds, so the next render may
//!   still add slots.
//! - **Accessors released while mounted**: the instance loses every slot and
//!   renders as if freshly mounted, so no query keeps a collection from the
//!   closed handle.
//! - **Host dropped with mounted components**: every instance is torn down as
//!   if unmounted; a warning is logged when enabled in [`RuntimeConfig`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use bbui_data::{AccessorSlot, Session};
use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::hooks::RenderCx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

struct Instance {
    name: &'static str,
    hooks: Vec<Box<dyn Any>>,
    renders: u64,
    settled: bool,
}

impl Instance {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            hooks: Vec::new(),
            renders: 0,
            settled: false,
        }
    }

    /// Drop slots last-created first, so dependent queries go before the
    /// accessor that owns their collections.
    fn clear_slots(&mut self) -> usize {
        let slots = self.hooks.len();
        while let Some(slot) = self.hooks.pop() {
            drop(slot);
        }
        self.settled = false;
        slots
    }

    fn teardown(mut self, id: ComponentId) {
        let slots = self.clear_slots();
        debug!(component = %id, name = self.name, slots, "component torn down");
    }
}

/// Owns every mounted component instance and the session they read from.
pub struct ComponentHost<S: Session> {
    session: S,
    config: RuntimeConfig,
    instances: BTreeMap<ComponentId, Instance>,
    next_id: u64,
}

impl<S: Session> fmt::Debug for ComponentHost<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("config", &self.config)
            .field("mounted", &self.instances.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<S> ComponentHost<S>
where
    S: Session,
    S::Handle: Clone + 'static,
{
    #[must_use]
    pub fn new(session: S) -> Self {
        Self {
            session,
            config: RuntimeConfig::default(),
            instances: BTreeMap::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Create an instance with empty hook storage. Nothing is opened until
    /// its first render.
    pub fn mount(&mut self, name: &'static str) -> ComponentId {
        self.next_id += 1;
        let id = ComponentId(self.next_id);
        self.instances.insert(id, Instance::new(name));
        debug!(component = %id, name, "component mounted");
        id
    }

    /// Render instance `id` once.
    ///
    /// With hook-order checking on, a render that calls fewer or more hooks
    /// than the first successful render fails with
    /// [`RuntimeError::HookCountChanged`].
    pub fn render<R>(
        &mut self,
        id: ComponentId,
        body: impl FnOnce(&mut RenderCx<'_, S>) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        let check = self.config.check_hook_order;
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownComponent(id))?;
        instance.renders += 1;

        let mut cx = RenderCx {
            id,
            session: &self.session,
            hooks: &mut instance.hooks,
            cursor: 0,
            allow_growth: !(check && instance.settled),
        };
        let out = body(&mut cx)?;
        let called = cx.cursor;

        if check && instance.settled && called != instance.hooks.len() {
            return Err(RuntimeError::HookCountChanged {
                component: id,
                expected: instance.hooks.len(),
                actual: called,
            });
        }
        instance.settled = true;
        trace!(component = %id, render = instance.renders, hooks = called, "component rendered");
        Ok(out)
    }

    /// Tear down instance `id`, closing its accessor. Returns `false` if it
    /// was not mounted.
    pub fn unmount(&mut self, id: ComponentId) -> bool {
        match self.instances.remove(&id) {
            Some(instance) => {
                instance.teardown(id);
                true
            }
            None => {
                debug!(component = %id, "unmount of component that is not mounted");
                false
            }
        }
    }

    /// Close the accessors of instance `id` without unmounting it.
    ///
    /// The instance's query slots go with them, since their collections were
    /// closed by the handle. The next render reopens the accessor and fetches
    /// every query again. Returns how many handles were closed.
    pub fn release_accessors(&mut self, id: ComponentId) -> Result<usize, RuntimeError> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownComponent(id))?;
        let released = instance
            .hooks
            .iter()
            .filter_map(|slot| slot.downcast_ref::<AccessorSlot<S::Handle>>())
            .filter(|slot| slot.is_held())
            .count();
        let slots = instance.clear_slots();
        debug!(component = %id, released, slots, "accessors released");
        Ok(released)
    }

    #[must_use]
    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.instances.contains_key(&id)
    }

    #[must_use]
    pub fn mounted(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn render_count(&self, id: ComponentId) -> Option<u64> {
        self.instances.get(&id).map(|i| i.renders)
    }
}

impl<S: Session> Drop for ComponentHost<S> {
    fn drop(&mut self) {
        if self.instances.is_empty() {
            return;
        }
        if self.config.warn_on_leaked_components {
            let names: Vec<&str> = self.instances.values().map(|i| i.name).collect();
            warn!(count = names.len(), ?names, "host dropped with components still mounted");
        }
        for (id, instance) in std::mem::take(&mut self.instances) {
            instance.teardown(id);
        }
    }
}
