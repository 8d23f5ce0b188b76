#![forbid(unsafe_code)]

//! Templates and dynamic template instantiation.
//!
//! - [`Template`]: a parameterized producer of tree nodes.
//! - [`unpack_tags`]: binds produced items to tag names with
//!   extended-unpacking rules.
//! - [`DynamicTemplate`]: a tree node that re-instantiates its template
//!   whenever the template, its arguments, or its keyword data are replaced,
//!   coalescing bursts of changes into one refresh per scheduler tick.

pub mod dynamic;
pub mod error;
pub mod tags;
pub mod template;

pub use dynamic::{DynamicTemplate, DynamicTemplateBuilder};
pub use error::{DynamicTemplateError, TemplateError, UnpackError};
pub use tags::{Tagged, TaggedMap, unpack_tags};
pub use template::{Args, Data, FnTemplate, Template, TemplateRef, Value};
