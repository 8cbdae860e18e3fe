#![forbid(unsafe_code)]

//! In-process live collection.
//!
//! # Design
//!
//! [`DataCollection<T>`] is a shared handle (`Rc<RefCell<..>>`) over an
//! order-preserving list of entities with an id index. The transport fills it
//! with [`resolve`](DataCollection::resolve) once the initial fetch returns and
//! pushes incremental changes through [`apply`](DataCollection::apply).
//!
//! # Invariants
//!
//! 1. `index[id] == position` for every entity in `items`.
//! 2. Every entity held satisfies the collection's query filters.
//! 3. Once closed, the collection never changes again: late updates are
//!    ignored and reported as not applied.
//! 4. `version` increments exactly once per applied change.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::model::{Entity, EntityId};
use crate::query::Query;
use crate::session::{Closable, LiveCollection};

/// Incremental change pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<T> {
    /// Insert a new entity or replace the one with the same id.
    Upsert(T),
    /// Drop the entity with this id, if present.
    Remove(EntityId),
}

struct CollectionInner<T> {
    query: Query,
    items: Vec<T>,
    index: FxHashMap<EntityId, usize>,
    resolved: bool,
    closed: bool,
    version: u64,
}

impl<T: Entity> CollectionInner<T> {
    fn reindex(&mut self) {
        self.index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            self.index.insert(item.id(), pos);
        }
    }

    /// Restore the query's order and limit after an insert or replace.
    fn settle(&mut self) {
        if self.query.order().is_some() || self.query.max_items().is_some() {
            let items = std::mem::take(&mut self.items);
            self.items = self.query.apply(items);
        }
        self.reindex();
    }

    fn remove(&mut self, id: EntityId) -> bool {
        match self.index.get(&id) {
            Some(&pos) => {
                self.items.remove(pos);
                self.reindex();
                true
            }
            None => false,
        }
    }
}

/// Shared, order-preserving container of one entity kind.
///
/// Cloning creates a new handle to the **same** collection.
pub struct DataCollection<T> {
    inner: Rc<RefCell<CollectionInner<T>>>,
}

impl<T> Clone for DataCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for DataCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DataCollection")
            .field("endpoint", &T::ENDPOINT)
            .field("len", &inner.items.len())
            .field("resolved", &inner.resolved)
            .field("closed", &inner.closed)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Entity> DataCollection<T> {
    /// A pending collection for `query`. Holds nothing until resolved.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CollectionInner {
                query,
                items: Vec::new(),
                index: FxHashMap::default(),
                resolved: false,
                closed: false,
                version: 0,
            })),
        }
    }

    /// A resolved, empty collection with no server subscription behind it.
    ///
    /// Returned by fetch callbacks whose inputs are not ready yet.
    #[must_use]
    pub fn empty() -> Self {
        let collection = Self::new(Query::new());
        collection.inner.borrow_mut().resolved = true;
        collection
    }

    /// Load the initial result set. Returns `false` if the collection was
    /// already closed.
    pub fn resolve(&self, items: impl IntoIterator<Item = T>) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            trace!(endpoint = T::ENDPOINT, "resolve ignored on closed collection");
            return false;
        }
        inner.items = inner.query.apply(items);
        inner.reindex();
        inner.resolved = true;
        inner.version += 1;
        true
    }

    /// Apply one pushed change. Returns whether the collection changed.
    pub fn apply(&self, update: Update<T>) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            trace!(endpoint = T::ENDPOINT, "update ignored on closed collection");
            return false;
        }
        let changed = match update {
            Update::Upsert(item) => {
                let id = item.id();
                if !inner.query.matches(&item) {
                    // The entity may have moved out of our filter.
                    inner.remove(id)
                } else {
                    let present = match inner.index.get(&id) {
                        Some(&pos) => {
                            inner.items[pos] = item;
                            true
                        }
                        None => {
                            inner.items.push(item);
                            false
                        }
                    };
                    inner.settle();
                    // A new entity may sort past the limit and be dropped.
                    present || inner.index.contains_key(&id)
                }
            }
            Update::Remove(id) => inner.remove(id),
        };
        if changed {
            inner.version += 1;
        }
        changed
    }

    #[must_use]
    pub fn get_by_id(&self, id: EntityId) -> Option<T> {
        let inner = self.inner.borrow();
        inner.index.get(&id).map(|&pos| inner.items[pos].clone())
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.inner.borrow().index.contains_key(&id)
    }

    #[must_use]
    pub fn array(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    /// Borrow the entities without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` pushes updates into this same collection.
    pub fn with_array<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Whether the initial result set has arrived.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().resolved
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    #[must_use]
    pub fn query(&self) -> Query {
        self.inner.borrow().query.clone()
    }

    /// Whether both handles refer to the same collection.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakCollection<T> {
        WeakCollection {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T: Entity> Closable for DataCollection<T> {
    fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return;
        }
        inner.closed = true;
        debug!(
            endpoint = T::ENDPOINT,
            query = %inner.query,
            len = inner.items.len(),
            "collection closed"
        );
    }

    fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }
}

impl<T: Entity> LiveCollection for DataCollection<T> {
    type Item = T;

    fn len(&self) -> usize {
        DataCollection::len(self)
    }

    fn get_by_id(&self, id: EntityId) -> Option<T> {
        DataCollection::get_by_id(self, id)
    }

    fn array(&self) -> Vec<T> {
        DataCollection::array(self)
    }
}

/// Non-owning reference used by the transport to route pushes.
pub(crate) struct WeakCollection<T> {
    inner: Weak<RefCell<CollectionInner<T>>>,
}

impl<T: Entity> WeakCollection<T> {
    /// The live collection, unless it was dropped or closed.
    pub(crate) fn upgrade(&self) -> Option<DataCollection<T>> {
        let inner = self.inner.upgrade()?;
        if inner.borrow().closed {
            return None;
        }
        Some(DataCollection { inner })
    }
}
