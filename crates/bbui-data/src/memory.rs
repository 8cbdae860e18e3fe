#![forbid(unsafe_code)]

//! In-process session backed by plain tables.
//!
//! [`MemorySession`] implements [`Session`] without a server: entity tables
//! live in memory, fetches resolve immediately, and
//! [`publish`](MemorySession::publish) / [`retract`](MemorySession::retract)
//! play the role of server push updates. It is used by the demo binary and
//! the test suites, and doubles as a reference for transport implementors.
//!
//! # Invariants
//!
//! 1. Closing a [`MemoryHandle`] closes every collection fetched through it.
//! 2. Pushes reach only collections that are still alive and open; dropped or
//!    closed collections are pruned lazily during the next push.
//! 3. `handles_opened - handles_closed` equals the number of open handles.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::collection::{DataCollection, Update};
use crate::error::{DataError, Result};
use crate::model::{Entity, EntityId};
use crate::query::Query;
use crate::session::{Closable, Session, SubscriptionHandle};

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SessionStats {
    pub handles_opened: u64,
    pub handles_closed: u64,
    pub fetches: u64,
}

impl SessionStats {
    #[must_use]
    pub fn open_handles(&self) -> u64 {
        self.handles_opened - self.handles_closed
    }
}

/// Routes a type-erased `Update<T>` to one collection. Returns `false` once
/// the collection is gone so the sink can be pruned.
type Sink = Box<dyn Fn(&dyn Any) -> bool>;

#[derive(Default)]
struct SessionState {
    tables: FxHashMap<TypeId, Box<dyn Any>>,
    sinks: FxHashMap<TypeId, Vec<Sink>>,
    stats: SessionStats,
    next_handle: u64,
    refuse_open: Option<String>,
    fail_next_fetch: Option<String>,
}

impl SessionState {
    fn table_mut<T: Entity>(&mut self) -> Option<&mut Vec<T>> {
        self.tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<T>::new()))
            .downcast_mut::<Vec<T>>()
    }

    fn table<T: Entity>(&self) -> Vec<T> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|t| t.downcast_ref::<Vec<T>>())
            .cloned()
            .unwrap_or_default()
    }

    fn route<T: Entity>(&mut self, update: &Update<T>) {
        if let Some(sinks) = self.sinks.get_mut(&TypeId::of::<T>()) {
            sinks.retain(|sink| sink(update));
        }
    }
}

/// Shared in-memory session. Cloning yields another handle on the same state.
#[derive(Clone, Default)]
pub struct MemorySession {
    state: Rc<RefCell<SessionState>>,
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("stats", &self.state.borrow().stats)
            .finish_non_exhaustive()
    }
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table for `T` without notifying open collections.
    pub fn insert<T: Entity>(&self, items: impl IntoIterator<Item = T>) {
        if let Some(table) = self.state.borrow_mut().table_mut::<T>() {
            for item in items {
                upsert_row(table, item);
            }
        }
    }

    /// Create or replace one entity and push it to open collections.
    pub fn publish<T: Entity>(&self, item: T) {
        let mut state = self.state.borrow_mut();
        if let Some(table) = state.table_mut::<T>() {
            upsert_row(table, item.clone());
        }
        state.route(&Update::Upsert(item));
    }

    /// Delete one entity and push the removal to open collections.
    pub fn retract<T: Entity>(&self, id: EntityId) {
        let mut state = self.state.borrow_mut();
        if let Some(table) = state.table_mut::<T>() {
            table.retain(|row| row.id() != id);
        }
        state.route(&Update::<T>::Remove(id));
    }

    /// Make every following `open` fail until [`allow_open`](Self::allow_open).
    pub fn refuse_open(&self, reason: impl Into<String>) {
        self.state.borrow_mut().refuse_open = Some(reason.into());
    }

    pub fn allow_open(&self) {
        self.state.borrow_mut().refuse_open = None;
    }

    /// Make the next fetch through any handle of this session fail.
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_next_fetch = Some(reason.into());
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.state.borrow().stats
    }
}

fn upsert_row<T: Entity>(table: &mut Vec<T>, item: T) {
    match table.iter_mut().find(|row| row.id() == item.id()) {
        Some(row) => *row = item,
        None => table.push(item),
    }
}

impl Session for MemorySession {
    type Handle = MemoryHandle;

    fn open(&self) -> Result<MemoryHandle> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = &state.refuse_open {
            return Err(DataError::open_refused(reason.clone()));
        }
        state.next_handle += 1;
        state.stats.handles_opened += 1;
        let id = state.next_handle;
        debug!(handle = id, "subscription opened");
        Ok(MemoryHandle {
            id,
            session: self.clone(),
            state: Rc::new(RefCell::new(HandleState::default())),
        })
    }
}

#[derive(Default)]
struct HandleState {
    closed: bool,
    collections: Vec<Box<dyn Closable>>,
}

/// Subscription handle of a [`MemorySession`].
///
/// Cloning yields another reference to the same subscription.
#[derive(Clone)]
pub struct MemoryHandle {
    id: u64,
    session: MemorySession,
    state: Rc<RefCell<HandleState>>,
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryHandle")
            .field("id", &self.id)
            .field("closed", &state.closed)
            .field("collections", &state.collections.len())
            .finish()
    }
}

impl MemoryHandle {
    /// Fetch the entities of `T` matching `query` as a live collection.
    ///
    /// The collection is resolved immediately, receives pushes until closed,
    /// and is closed together with this handle.
    pub fn get<T: Entity>(&self, query: Query) -> Result<DataCollection<T>> {
        if self.state.borrow().closed {
            return Err(DataError::HandleReleased { handle: self.id });
        }
        let collection = DataCollection::new(query);
        {
            let mut session = self.session.state.borrow_mut();
            if let Some(reason) = session.fail_next_fetch.take() {
                return Err(DataError::fetch_failed(T::ENDPOINT, reason));
            }
            session.stats.fetches += 1;
            collection.resolve(session.table::<T>());

            let weak = collection.downgrade();
            let sink: Sink = Box::new(move |update: &dyn Any| match weak.upgrade() {
                Some(target) => {
                    if let Some(update) = update.downcast_ref::<Update<T>>() {
                        target.apply(update.clone());
                    }
                    true
                }
                None => false,
            });
            session.sinks.entry(TypeId::of::<T>()).or_default().push(sink);
        }
        {
            let mut state = self.state.borrow_mut();
            state.collections.retain(|tracked| !tracked.is_closed());
            state.collections.push(Box::new(collection.clone()));
        }
        debug!(
            handle = self.id,
            endpoint = T::ENDPOINT,
            query = %collection.query(),
            len = collection.len(),
            "collection fetched"
        );
        Ok(collection)
    }

    /// Shorthand for `get(Query::new())`.
    pub fn get_all<T: Entity>(&self) -> Result<DataCollection<T>> {
        self.get(Query::new())
    }
}

impl Closable for MemoryHandle {
    fn close(&self) {
        let collections = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.collections)
        };
        for collection in &collections {
            collection.close();
        }
        self.session.state.borrow_mut().stats.handles_closed += 1;
        debug!(
            handle = self.id,
            collections = collections.len(),
            "subscription closed"
        );
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl SubscriptionHandle for MemoryHandle {
    fn id(&self) -> u64 {
        self.id
    }
}
