#![forbid(unsafe_code)]

//! The plain tree node.

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::object::{Declarative, DeclarativeRef, Object};

/// A named node with no behavior beyond the base lifecycle.
///
/// Used for containers and as the usual output of templates.
#[derive(Debug)]
pub struct Element {
    object: Object,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn Declarative> = this.clone();
            Self {
                object: Object::new(name, this),
            }
        })
    }

    /// Build a node and append `children` to it.
    #[must_use]
    pub fn with_children(
        name: impl Into<String>,
        children: impl IntoIterator<Item = DeclarativeRef>,
    ) -> Rc<Self> {
        let element = Self::new(name);
        let parent: DeclarativeRef = element.clone();
        for child in children {
            child.object().set_parent(Some(&parent));
        }
        element
    }
}

impl Declarative for Element {
    fn object(&self) -> &Object {
        &self.object
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
