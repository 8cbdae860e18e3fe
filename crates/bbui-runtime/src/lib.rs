#![forbid(unsafe_code)]

//! Component host for the bbui dashboard.
//!
//! [`ComponentHost`] owns one storage cell per mounted component instance.
//! Inside [`ComponentHost::render`] a component receives a [`RenderCx`] and
//! calls the data hooks in a fixed order:
//!
//! - [`RenderCx::use_accessor`]: the instance's subscription handle, opened on
//!   first render and released on unmount.
//! - [`RenderCx::use_query`]: a fetch run once per instance.
//! - [`RenderCx::use_dynamic_query`]: a fetch rerun when its dependency vector
//!   changes by value.
//!
//! Hook slots are addressed by call position, so a component must call the
//! same hooks in the same order on every render.
//!
//! # Invariants
//!
//! 1. Each instance's slots survive re-renders and are dropped exactly once,
//!    on unmount or when the host is dropped.
//! 2. Instances never share slots.
//! 3. Unmounting an unknown or already unmounted component is a no-op.

pub mod component;
pub mod config;
pub mod error;
pub mod hooks;

pub use component::{ComponentHost, ComponentId};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use hooks::RenderCx;
