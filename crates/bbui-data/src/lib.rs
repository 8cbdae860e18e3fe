#![forbid(unsafe_code)]

//! Data layer for the bbui build dashboard.
//!
//! This crate binds UI components to server-synchronized data:
//!
//! - [`Session`], [`SubscriptionHandle`] and [`LiveCollection`]: the contract
//!   expected from the transport layer.
//! - [`AccessorSlot`]: holds the one subscription handle a component owns and
//!   releases it exactly once.
//! - [`StaticQuery`]: memoizes a single fetch for a component's lifetime.
//! - [`DynamicQuery`]: memoizes a fetch keyed by a [`DependencyVector`],
//!   closing the previous collection when the key changes by value.
//! - [`DataCollection`] and [`MemorySession`]: an in-process implementation of
//!   the collaborator contract, used by the demo and the test suites.
//!
//! # Invariants
//!
//! 1. A slot holds zero or one live resource at any time.
//! 2. A resource displaced from a slot is closed exactly once.
//! 3. A [`DynamicQuery`] entry stores its key and value together; they are
//!    never observed out of sync.
//! 4. Nothing in this crate is `Send`: all state lives on the UI thread.

pub mod binding;
pub mod collection;
pub mod dependency;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;
pub mod session;

pub use binding::{AccessorSlot, DynamicQuery, StaticQuery};
pub use collection::{DataCollection, Update};
pub use dependency::{DepValue, DependencyVector};
pub use error::{DataError, Result};
pub use memory::{MemoryHandle, MemorySession, SessionStats};
pub use model::{Build, Builder, Buildrequest, Entity, EntityId, Master, Worker};
pub use query::{Filter, Order, Query};
pub use session::{Closable, LiveCollection, Session, SubscriptionHandle};
