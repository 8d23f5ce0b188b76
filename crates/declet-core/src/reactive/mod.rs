#![forbid(unsafe_code)]

//! Reactive data bindings for Declet.
//!
//! - [`Observable`]: a shared, version-tracked value with change notification.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Computed`]: a lazily-evaluated value derived from [`Dependency`]
//!   sources.
//!
//! Everything here is single-threaded (`Rc`), matching the cooperative model
//! of the rest of the tree: a write notifies synchronously, and any deferred
//! work goes through [`crate::schedule`].

pub mod computed;
pub mod observable;

pub use computed::{Computed, Dependency};
pub use observable::{Change, ChangeKind, Observable, Subscription};
