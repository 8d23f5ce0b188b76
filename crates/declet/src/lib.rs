#![forbid(unsafe_code)]

//! Declet public facade crate.
//!
//! Re-exports the tree, the scheduler, and the dynamic template node under
//! one roof. Most users only need the prelude:
//!
//! ```
//! use std::rc::Rc;
//! use declet::prelude::*;
//!
//! let queue = Rc::new(TickQueue::new());
//! let root: DeclarativeRef = Element::new("root");
//! let rows = TemplateRef::new(FnTemplate::new("Rows", ["count"], |args, _| {
//!     let count = args[0].as_u64().unwrap_or(0);
//!     Ok((0..count)
//!         .map(|i| Element::new(format!("row{i}")) as DeclarativeRef)
//!         .collect())
//! }));
//! let node = DynamicTemplate::builder()
//!     .base(rows)
//!     .args([Value::from(2)])
//!     .build(queue.clone());
//! let anchor: DeclarativeRef = node.clone();
//! anchor.object().set_parent(Some(&root));
//!
//! root.initialize().unwrap();
//! assert_eq!(root.object().child_count(), 3);
//!
//! node.set_args([Value::from(5)]);
//! queue.drain();
//! assert_eq!(node.items().len(), 5);
//! ```

pub use declet_core as core;
pub use declet_template as template;
pub use declet_tree as tree;

pub mod prelude {
    pub use declet_core::config::SchedulerConfig;
    pub use declet_core::reactive::{Computed, Observable, Subscription};
    pub use declet_core::schedule::{DrainReport, Scheduler, TaskHandle, TickQueue};
    pub use declet_template::{
        Data, DynamicTemplate, DynamicTemplateError, FnTemplate, Tagged, TaggedMap, Template,
        TemplateError, TemplateRef, UnpackError, Value, unpack_tags,
    };
    pub use declet_tree::{Declarative, DeclarativeRef, Element, Lifecycle};
}
