#![forbid(unsafe_code)]

//! A tree node that instantiates a template in place of itself.
//!
//! # Design
//!
//! [`DynamicTemplate`] sits in its parent's child list as an anchor. On every
//! refresh it applies its `base` template to `args` and `data`, destroys the
//! previous items, and inserts the new ones into the parent immediately
//! before itself. The items are then bound to `tags`/`startag` and published
//! through the observable `tagged` map.
//!
//! Input changes are coalesced: any number of `base`/`args`/`data` updates
//! between two scheduler ticks produce exactly one instantiation, using the
//! values current when it runs. Tag changes rebind the existing items
//! synchronously and never re-instantiate.
//!
//! # Invariants
//!
//! 1. At most one refresh task is pending per node.
//! 2. Items are inserted into the parent contiguously, in template order,
//!    right before this node.
//! 3. After a successful refresh every previous item is destroyed.
//! 4. A failed template call leaves `items` and `tagged` untouched.
//! 5. After `destroy()` no refresh runs and nothing is scheduled.
//!
//! # Failure Modes
//!
//! - **No parent**: `refresh()` returns [`DynamicTemplateError::NoParent`]
//!   before invoking the template.
//! - **Template error**: returned as [`DynamicTemplateError::Template`].
//! - **Tag mismatch after instantiation**: returned as
//!   [`DynamicTemplateError::Unpack`]; `items` already holds the new items
//!   while `tagged` still describes the old ones.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use declet_core::BoxError;
use declet_core::reactive::{Observable, Subscription};
use declet_core::schedule::{Scheduler, TaskHandle};
use declet_tree::{Declarative, DeclarativeRef, InitializeError, Lifecycle, Object};
use tracing::{debug, debug_span, trace};
use web_time::Instant;

use crate::error::{DynamicTemplateError, UnpackError};
use crate::tags::{TaggedMap, unpack_tags};
use crate::template::{Args, Data, TemplateRef, Value};

/// Label of the deferred refresh task.
pub const REFRESH_TASK_LABEL: &str = "dynamic_template.refresh";

const DEFAULT_NAME: &str = "DynamicTemplate";

/// Builder for [`DynamicTemplate`]. Initial values never schedule a refresh.
#[derive(Debug, Default)]
pub struct DynamicTemplateBuilder {
    name: Option<String>,
    base: Option<TemplateRef>,
    args: Args,
    tags: Vec<String>,
    startag: String,
    data: Data,
}

impl DynamicTemplateBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn base(mut self, base: TemplateRef) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn startag(mut self, startag: impl Into<String>) -> Self {
        self.startag = startag.into();
        self
    }

    #[must_use]
    pub fn data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    /// Add one keyword to `data`.
    #[must_use]
    pub fn datum(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Create the node. Refreshes requested later go through `scheduler`.
    #[must_use]
    pub fn build(self, scheduler: Rc<dyn Scheduler>) -> Rc<DynamicTemplate> {
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        let node = Rc::new_cyclic(|weak: &Weak<DynamicTemplate>| {
            let this: Weak<dyn Declarative> = weak.clone();
            DynamicTemplate {
                object: Object::new(name, this),
                this: weak.clone(),
                scheduler,
                base: Observable::new(self.base),
                args: Observable::new(self.args),
                tags: Observable::new(self.tags),
                startag: Observable::new(self.startag),
                data: Observable::new(self.data),
                tagged: Observable::new(TaggedMap::new()),
                items: RefCell::new(Vec::new()),
                pending: RefCell::new(None),
                watchers: RefCell::new(Vec::new()),
                refreshes: Cell::new(0),
            }
        });
        node.watch_inputs();
        node
    }
}

/// Declarative node that expands a template into its parent.
pub struct DynamicTemplate {
    object: Object,
    this: Weak<DynamicTemplate>,
    scheduler: Rc<dyn Scheduler>,
    base: Observable<Option<TemplateRef>>,
    args: Observable<Args>,
    tags: Observable<Vec<String>>,
    startag: Observable<String>,
    data: Observable<Data>,
    tagged: Observable<TaggedMap>,
    items: RefCell<Vec<DeclarativeRef>>,
    pending: RefCell<Option<TaskHandle>>,
    watchers: RefCell<Vec<Subscription>>,
    refreshes: Cell<u64>,
}

impl fmt::Debug for DynamicTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTemplate")
            .field("object", &self.object)
            .field("base", &self.base.get())
            .field("tags", &self.tags.get())
            .field("startag", &self.startag.get())
            .field("items", &self.items.borrow().len())
            .field("pending", &self.has_pending_refresh())
            .finish()
    }
}

impl DynamicTemplate {
    #[must_use]
    pub fn builder() -> DynamicTemplateBuilder {
        DynamicTemplateBuilder::default()
    }

    fn watch_inputs(&self) {
        let watchers = vec![
            self.schedule_on_update(&self.base),
            self.schedule_on_update(&self.args),
            self.schedule_on_update(&self.data),
        ];
        *self.watchers.borrow_mut() = watchers;
    }

    fn schedule_on_update<T: Clone + PartialEq + 'static>(
        &self,
        source: &Observable<T>,
    ) -> Subscription {
        let weak = self.this.clone();
        source.subscribe(move |change| {
            if change.is_update()
                && let Some(node) = weak.upgrade()
            {
                node.request_refresh();
            }
        })
    }

    /// Store a tag input, then rebind the current items if it changed.
    fn set_tag_input<T: Clone + PartialEq + 'static>(
        &self,
        source: &Observable<T>,
        value: T,
    ) -> Result<(), UnpackError> {
        if source.with(|current| *current == value) {
            return Ok(());
        }
        source.set(value);
        if self.object.is_destroyed() {
            return Ok(());
        }
        self.rebuild_tags().inspect_err(|err| {
            debug!(
                message = "dynamic_template.tags_rejected",
                node = %self.object.id(),
                error = %err
            );
        })
    }

    // --- inputs ---

    #[must_use]
    pub fn base(&self) -> Option<TemplateRef> {
        self.base.get()
    }

    /// Replace the template. Schedules a refresh unless it is the same
    /// template object.
    pub fn set_base(&self, base: Option<TemplateRef>) {
        self.base.set(base);
    }

    #[must_use]
    pub fn args(&self) -> Args {
        self.args.get()
    }

    /// Replace the positional arguments. Schedules a refresh when they
    /// differ.
    pub fn set_args(&self, args: impl IntoIterator<Item = Value>) {
        self.args.set(args.into_iter().collect());
    }

    #[must_use]
    pub fn data(&self) -> Data {
        self.data.get()
    }

    /// Replace the keyword data. Schedules a refresh when it differs.
    pub fn set_data(&self, data: Data) {
        self.data.set(data);
    }

    /// Edit the keyword data in place. In-place edits never schedule a
    /// refresh; the next refresh sees them.
    pub fn edit_data(&self, f: impl FnOnce(&mut Data)) {
        self.data.modify(f);
    }

    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.tags.get()
    }

    /// Replace the fixed tags and rebind the current items.
    ///
    /// # Errors
    ///
    /// Returns the [`UnpackError`] when the current items do not fit; the
    /// new tags are kept and `tagged` is left as it was.
    pub fn set_tags<I, S>(&self, tags: I) -> Result<(), UnpackError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tag_input(&self.tags, tags.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn startag(&self) -> String {
        self.startag.get()
    }

    /// Replace the overflow tag and rebind the current items.
    ///
    /// # Errors
    ///
    /// Same as [`set_tags`](Self::set_tags).
    pub fn set_startag(&self, startag: impl Into<String>) -> Result<(), UnpackError> {
        self.set_tag_input(&self.startag, startag.into())
    }

    // --- outputs ---

    /// Snapshot of the items produced by the last successful instantiation.
    #[must_use]
    pub fn items(&self) -> Vec<DeclarativeRef> {
        self.items.borrow().clone()
    }

    /// Snapshot of the current tag bindings.
    #[must_use]
    pub fn tagged(&self) -> TaggedMap {
        self.tagged.get()
    }

    /// Shared handle to the tag bindings, for derived values.
    #[must_use]
    pub fn tagged_observable(&self) -> Observable<TaggedMap> {
        self.tagged.clone()
    }

    /// Call `f` whenever the tag bindings are replaced.
    pub fn subscribe_tagged(&self, f: impl Fn(&TaggedMap) + 'static) -> Subscription {
        self.tagged.subscribe(move |change| f(change.value))
    }

    #[must_use]
    pub fn has_pending_refresh(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }

    /// Completed instantiations since construction.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.get()
    }

    // --- engine ---

    /// Schedule a refresh unless one is already pending or the node is
    /// destroyed.
    pub fn request_refresh(&self) {
        if self.object.is_destroyed() || self.has_pending_refresh() {
            return;
        }
        let weak = self.this.clone();
        let handle = self.scheduler.schedule(
            REFRESH_TASK_LABEL,
            Box::new(move || -> Result<(), BoxError> {
                let Some(node) = weak.upgrade() else {
                    return Ok(());
                };
                node.refresh().map_err(Into::into)
            }),
        );
        trace!(
            message = "dynamic_template.refresh_scheduled",
            node = %self.object.id(),
            task = %handle.id()
        );
        if handle.is_pending() {
            *self.pending.borrow_mut() = Some(handle);
        }
    }

    /// Instantiate the template now and swap the new items in for the old.
    ///
    /// # Errors
    ///
    /// See the module-level failure modes.
    pub fn refresh(&self) -> Result<(), DynamicTemplateError> {
        // A running task is no longer pending, so this only cancels a queued
        // one when called directly.
        let pending = self.pending.borrow_mut().take();
        if let Some(handle) = pending {
            handle.unschedule();
        }

        let Some(parent) = self.object.parent() else {
            return Err(DynamicTemplateError::NoParent {
                node: self.object.name().to_string(),
            });
        };

        let span = debug_span!(
            "dynamic_template.refresh",
            node = %self.object.id(),
            name = self.object.name(),
            old_items = tracing::field::Empty,
            new_items = tracing::field::Empty,
            refresh_duration_us = tracing::field::Empty,
        );
        let _guard = span.enter();
        let started = Instant::now();

        let (base, args, data) = (self.base.get(), self.args.get(), self.data.get());
        let items = match base {
            Some(template) => template.instantiate(&args, &data)?,
            None => Vec::new(),
        };

        let old = self.items();
        span.record("old_items", old.len() as u64);
        span.record("new_items", items.len() as u64);
        for item in &old {
            if !item.object().is_destroyed() {
                item.destroy();
            }
        }

        if !items.is_empty() {
            parent
                .object()
                .insert_children(Some(self as &dyn Declarative), &items);
        }
        *self.items.borrow_mut() = items;
        self.refreshes.set(self.refreshes.get() + 1);
        span.record(
            "refresh_duration_us",
            started.elapsed().as_micros() as u64,
        );

        self.rebuild_tags()?;
        Ok(())
    }

    /// Rebind the current items to the current tags.
    ///
    /// # Errors
    ///
    /// Returns the [`UnpackError`] and leaves `tagged` unchanged when the
    /// item count does not fit.
    pub fn rebuild_tags(&self) -> Result<(), UnpackError> {
        let (tags, startag) = (self.tags.get(), self.startag.get());
        let tagged = {
            let items = self.items.borrow();
            unpack_tags(&tags, &startag, &items)?
        };
        self.tagged.set(tagged);
        Ok(())
    }
}

impl Declarative for DynamicTemplate {
    fn object(&self) -> &Object {
        &self.object
    }

    /// Instantiate, initialize the new items, then initialize this node.
    fn initialize(&self) -> Result<(), InitializeError> {
        if self.object.lifecycle() != Lifecycle::Constructed {
            return Ok(());
        }
        self.refresh()
            .map_err(|err| InitializeError::new(self.object.name(), err))?;
        for item in self.items() {
            item.initialize()?;
        }
        self.object.initialize_base()
    }

    /// Release everything this node holds. The items stay in the parent;
    /// their owner decides their fate.
    fn destroy(&self) {
        if self.object.is_destroyed() {
            return;
        }
        self.object.destroy_base();

        let watchers = std::mem::take(&mut *self.watchers.borrow_mut());
        drop(watchers);
        self.data.set(Data::new());
        self.tagged.set(TaggedMap::new());

        let pending = self.pending.borrow_mut().take();
        if let Some(handle) = pending {
            handle.unschedule();
        }
        let released = std::mem::take(&mut *self.items.borrow_mut());
        debug!(
            message = "dynamic_template.destroyed",
            node = %self.object.id(),
            released = released.len()
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
