#![forbid(unsafe_code)]

//! Node identity, parent/child membership, and lifecycle.
//!
//! # Ownership
//!
//! Parents own their children (`Rc`); children point back with `Weak`.
//! Every [`Object`] also keeps a `Weak` to the node that embeds it so it can
//! hand itself to a new parent.
//!
//! # Invariants
//!
//! 1. A node appears in at most one parent's child list, and its parent link
//!    names that parent.
//! 2. Lifecycle only moves forward: `Constructed → Initialized → Destroyed`
//!    (or straight to `Destroyed`).
//! 3. `destroy_base()` is idempotent.
//! 4. No `RefCell` borrow is held while child hooks or lifecycle watchers
//!    run.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use declet_core::BoxError;
use declet_core::reactive::{Observable, Subscription};
use thiserror::Error;
use tracing::{debug, trace};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> NodeId {
    NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Process-unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    #[default]
    Constructed,
    Initialized,
    Destroyed,
}

/// A node failed during `initialize()`.
#[derive(Debug, Error)]
#[error("failed to initialize `{node}`")]
pub struct InitializeError {
    pub node: String,
    #[source]
    pub source: BoxError,
}

impl InitializeError {
    pub fn new(node: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            node: node.into(),
            source: source.into(),
        }
    }
}

/// Shared handle to any tree node.
pub type DeclarativeRef = Rc<dyn Declarative>;

/// A node of the declarative tree.
///
/// Implementors embed an [`Object`] and may override the lifecycle hooks.
/// Overrides should call [`Object::initialize_base`] /
/// [`Object::destroy_base`] to keep the base behavior.
pub trait Declarative: Any {
    /// The embedded base state.
    fn object(&self) -> &Object;

    /// Initialize this node and its children.
    ///
    /// # Errors
    ///
    /// Returns the first failure reported by this node or a descendant.
    fn initialize(&self) -> Result<(), InitializeError> {
        self.object().initialize_base()
    }

    /// Destroy this node and its children, then leave the parent.
    fn destroy(&self) {
        self.object().destroy_base();
    }

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Declarative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.object();
        write!(f, "{}{}", object.name(), object.id())
    }
}

impl dyn Declarative {
    /// Downcast to a concrete node type.
    #[must_use]
    pub fn downcast_ref<T: Declarative>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Identity comparison.
    #[must_use]
    pub fn same_node(&self, other: &dyn Declarative) -> bool {
        self.object().id() == other.object().id()
    }
}

/// Base state embedded in every node.
pub struct Object {
    id: NodeId,
    name: String,
    this: Weak<dyn Declarative>,
    parent: RefCell<Option<Weak<dyn Declarative>>>,
    children: RefCell<Vec<DeclarativeRef>>,
    lifecycle: Observable<Lifecycle>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lifecycle", &self.lifecycle())
            .field("children", &self.child_count())
            .finish()
    }
}

impl Object {
    /// Create the base state for the node that `this` points to.
    ///
    /// Call from inside `Rc::new_cyclic` so `this` refers to the node being
    /// built.
    pub fn new(name: impl Into<String>, this: Weak<dyn Declarative>) -> Self {
        Self {
            id: next_node_id(),
            name: name.into(),
            this,
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            lifecycle: Observable::new(Lifecycle::Constructed),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strong handle to the embedding node, if it is still alive.
    #[must_use]
    pub fn this(&self) -> Option<DeclarativeRef> {
        self.this.upgrade()
    }

    #[must_use]
    pub fn parent(&self) -> Option<DeclarativeRef> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Snapshot of the children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<DeclarativeRef> {
        self.children.borrow().clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Position of `child` among this node's children.
    #[must_use]
    pub fn index_of(&self, child: &dyn Declarative) -> Option<usize> {
        self.children
            .borrow()
            .iter()
            .position(|c| c.same_node(child))
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lifecycle() == Lifecycle::Initialized
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lifecycle() == Lifecycle::Destroyed
    }

    /// Call `f` on every lifecycle transition.
    pub fn watch_lifecycle(&self, f: impl Fn(Lifecycle) + 'static) -> Subscription {
        self.lifecycle.subscribe(move |change| f(*change.value))
    }

    /// Move this node under `parent` (appended last), or detach it with
    /// `None`.
    pub fn set_parent(&self, parent: Option<&DeclarativeRef>) {
        self.detach();
        let (Some(parent), Some(this)) = (parent, self.this()) else {
            return;
        };
        parent.object().children.borrow_mut().push(this);
        *self.parent.borrow_mut() = Some(Rc::downgrade(parent));
    }

    /// Remove this node from its parent's children.
    pub fn detach(&self) {
        let Some(parent) = self.parent.borrow_mut().take() else {
            return;
        };
        if let Some(parent) = parent.upgrade() {
            parent
                .object()
                .children
                .borrow_mut()
                .retain(|child| child.object().id() != self.id);
        }
    }

    /// Insert `items`, in order, immediately before `before`.
    ///
    /// Each item is first detached from its current parent. When `before` is
    /// `None` or not a child of this node the items are appended.
    pub fn insert_children(&self, before: Option<&dyn Declarative>, items: &[DeclarativeRef]) {
        for item in items {
            item.object().detach();
        }
        {
            let mut children = self.children.borrow_mut();
            let index = before
                .and_then(|anchor| children.iter().position(|c| c.same_node(anchor)))
                .unwrap_or(children.len());
            let tail = children.split_off(index);
            children.extend(items.iter().cloned());
            children.extend(tail);
        }
        for item in items {
            *item.object().parent.borrow_mut() = Some(self.this.clone());
        }
        trace!(
            message = "object.insert_children",
            parent = %self.id,
            count = items.len()
        );
    }

    /// Default `initialize()`: initialize a snapshot of the children, then
    /// mark this node initialized. Nodes past `Constructed` are left alone.
    ///
    /// # Errors
    ///
    /// Propagates the first child failure; this node stays `Constructed`.
    pub fn initialize_base(&self) -> Result<(), InitializeError> {
        if self.lifecycle() != Lifecycle::Constructed {
            return Ok(());
        }
        for child in self.children() {
            child.initialize()?;
        }
        self.lifecycle.set(Lifecycle::Initialized);
        trace!(message = "object.initialized", node = %self.id, name = %self.name);
        Ok(())
    }

    /// Default `destroy()`: mark destroyed, destroy every child, then leave
    /// the parent. Repeated calls do nothing.
    pub fn destroy_base(&self) {
        if self.is_destroyed() {
            return;
        }
        self.lifecycle.set(Lifecycle::Destroyed);
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in &children {
            child.destroy();
        }
        self.detach();
        debug!(
            message = "object.destroyed",
            node = %self.id,
            name = %self.name,
            children = children.len()
        );
    }
}
