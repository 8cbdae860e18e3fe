//! Contract between the binding layer and the transport that talks to the
//! server.
//!
//! The transport itself (REST fetch plus push updates) lives outside this
//! crate; [`crate::memory`] provides an in-process implementation.

use crate::error::Result;

/// A resource with server-visible lifetime that must be closed explicitly.
///
/// `close` is expected to be called at most once per resource by the binding
/// layer; implementations still treat a second call as a no-op.
pub trait Closable {
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Process-wide connection to the data server.
pub trait Session {
    type Handle: SubscriptionHandle;

    /// Open a new scoped subscription.
    ///
    /// Opening subscribes on the server side; the returned handle must be
    /// closed exactly once.
    fn open(&self) -> Result<Self::Handle>;
}

/// One open subscription. Supplies live collections while open.
pub trait SubscriptionHandle: Closable {
    /// Stable identifier, used in logs.
    fn id(&self) -> u64;
}

/// Ordered container of entities of one kind kept in sync with the server.
pub trait LiveCollection: Closable {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entity by its identity.
    fn get_by_id(&self, id: i64) -> Option<Self::Item>;

    /// Snapshot of the entities in order.
    fn array(&self) -> Vec<Self::Item>;
}
