#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in `Rc<RefCell<..>>`. Writers either
//! replace the value ([`set`](Observable::set)) or edit it in place
//! ([`modify`](Observable::modify)); subscribers learn which through
//! [`ChangeKind`].
//!
//! Callbacks are owned by the [`Subscription`] returned from
//! [`subscribe`](Observable::subscribe); the observable only holds `Weak`
//! pointers to them and prunes dead entries on the next notification.
//!
//! # Invariants
//!
//! 1. `set` with a value equal to the current one is a no-op: no version bump,
//!    no notification.
//! 2. Every notification carries the version produced by the write that
//!    caused it.
//! 3. Subscribers run in registration order.
//! 4. No borrow of the observable is held while callbacks run, so a callback
//!    may read or write any observable, including the one that notified it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// How a value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The value was replaced by a different value.
    Update,
    /// The value was edited in place.
    Mutate,
}

/// A change notification delivered to subscribers.
#[derive(Debug)]
pub struct Change<'a, T> {
    /// Whether the value was replaced or edited in place.
    pub kind: ChangeKind,
    /// The value after the change.
    pub value: &'a T,
    /// Version after the change.
    pub version: u64,
}

impl<T> Change<'_, T> {
    /// True for value-replacing writes.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.kind == ChangeKind::Update
    }
}

type Callback<T> = dyn Fn(&Change<'_, T>);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Wrap an initial value. Construction never notifies.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of writes that changed the value.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value, notifying subscribers with [`ChangeKind::Update`].
    ///
    /// Does nothing when `value` equals the current value.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify(ChangeKind::Update);
    }

    /// Edit the value in place, notifying subscribers with
    /// [`ChangeKind::Mutate`].
    ///
    /// # Panics
    ///
    /// Panics if `f` accesses this observable.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
            inner.version += 1;
        }
        self.notify(ChangeKind::Mutate);
    }

    /// Register a callback. It stays registered while the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, callback: impl Fn(&Change<'_, T>) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription::new(callback)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn notify(&self, kind: ChangeKind) {
        let (value, version, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.value.clone(), inner.version, callbacks)
        };
        let change = Change {
            kind,
            value: &value,
            version,
        };
        for callback in callbacks {
            callback(&change);
        }
    }
}

/// RAII guard for a registered callback.
///
/// Dropping the guard unsubscribes before the next notification.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl Subscription {
    fn new<T: 'static>(callback: Rc<Callback<T>>) -> Self {
        Self {
            _callback: Box::new(callback),
        }
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
