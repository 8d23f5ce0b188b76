#![forbid(unsafe_code)]

//! Declarative object tree.
//!
//! Every node embeds an [`Object`] holding its identity, parent link, ordered
//! children, and [`Lifecycle`]. Node types implement [`Declarative`] to hook
//! `initialize()` and `destroy()`; [`Element`] is the plain node used for
//! containers and template output.

pub mod element;
pub mod object;
pub mod object_dict;

pub use element::Element;
pub use object::{Declarative, DeclarativeRef, InitializeError, Lifecycle, NodeId, Object};
pub use object_dict::ObjectDict;
