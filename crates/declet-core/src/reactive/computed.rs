#![forbid(unsafe_code)]

//! Lazy computed values that re-derive when their dependencies change.
//!
//! # Design
//!
//! [`Computed<T>`] pairs a compute function with a cached result. Every
//! dependency holds a subscription that flips a shared dirty flag; the next
//! [`get()`](Computed::get) recomputes. The dirty flag lives outside the
//! cache's `RefCell`, so a dependency may change while the compute function
//! is running and the result is simply recomputed on the following read.
//!
//! # Invariants
//!
//! 1. `get()` never returns a value older than the last completed dependency
//!    change.
//! 2. The compute function runs at most once per change cycle.
//! 3. Version increments by exactly 1 per recomputation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// Anything a [`Computed`] can depend on.
pub trait Dependency {
    /// Call `callback` after every change until the subscription is dropped.
    fn on_change(&self, callback: Box<dyn Fn()>) -> Subscription;
}

impl<T: Clone + PartialEq + 'static> Dependency for Observable<T> {
    fn on_change(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }
}

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: Option<T>,
    version: u64,
}

/// A lazily-evaluated, memoized value derived from one or more
/// [`Dependency`] sources.
///
/// Cloning a `Computed` creates a new handle to the **same** cache.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
    dirty: Rc<Cell<bool>>,
    _subscriptions: Rc<Vec<Subscription>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            dirty: Rc::clone(&self.dirty),
            _subscriptions: Rc::clone(&self._subscriptions),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("dirty", &self.dirty.get())
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Derive a value from any number of dependencies.
    pub fn new(dependencies: &[&dyn Dependency], compute: impl Fn() -> T + 'static) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let subscriptions = dependencies
            .iter()
            .map(|dependency| {
                let dirty = Rc::clone(&dirty);
                dependency.on_change(Box::new(move || dirty.set(true)))
            })
            .collect();
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                compute: Box::new(compute),
                cached: None,
                version: 0,
            })),
            dirty,
            _subscriptions: Rc::new(subscriptions),
        }
    }

    /// Derive a value from a single observable.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let reader = source.clone();
        Self::new(&[source], move || reader.with(|value| map(value)))
    }

    /// Current value, recomputed first if a dependency changed.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Borrow the current value, recomputing first if needed.
    ///
    /// # Panics
    ///
    /// Panics if the compute function or `f` reads this same `Computed`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if self.dirty.replace(false) {
            inner.cached = None;
        }
        if inner.cached.is_none() {
            inner.version += 1;
        }
        let compute = &inner.compute;
        f(inner.cached.get_or_insert_with(|| compute()))
    }

    /// Whether the next read will recompute.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get() || self.inner.borrow().cached.is_none()
    }

    /// Force the next read to recompute.
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// Number of recomputations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_after_change() {
        let source = Observable::new(10);
        let doubled = Computed::from_observable(&source, |v| v * 2);

        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 20);
        assert_eq!(doubled.version(), 1);

        source.set(4);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 8);
        assert_eq!(doubled.version(), 2);
    }

    #[test]
    fn memoizes_between_changes() {
        let runs = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&runs);
        let source = Observable::new(1);
        let computed = Computed::from_observable(&source, move |v| {
            counter.set(counter.get() + 1);
            *v
        });

        let _ = computed.get();
        let _ = computed.get();
        assert_eq!(runs.get(), 1);

        source.set(1);
        let _ = computed.get();
        assert_eq!(runs.get(), 1);

        source.set(2);
        let _ = computed.get();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn several_dependencies() {
        let first = Observable::new("Ada".to_string());
        let last = Observable::new("Lovelace".to_string());
        let (f, l) = (first.clone(), last.clone());
        let full = Computed::new(&[&first, &last], move || format!("{} {}", f.get(), l.get()));

        assert_eq!(full.get(), "Ada Lovelace");
        last.set("Byron".to_string());
        assert_eq!(full.get(), "Ada Byron");
    }

    #[test]
    fn invalidate_forces_recompute() {
        let source = Observable::new(3);
        let computed = Computed::from_observable(&source, |v| *v);
        let _ = computed.get();
        computed.invalidate();
        assert!(computed.is_dirty());
        let _ = computed.get();
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn clone_shares_cache() {
        let source = Observable::new(1);
        let a = Computed::from_observable(&source, |v| v + 1);
        let b = a.clone();
        assert_eq!(a.get(), 2);
        source.set(5);
        assert_eq!(b.get(), 6);
        assert_eq!(a.version(), 2);
    }

    #[test]
    fn survives_source_drop() {
        let computed;
        {
            let source = Observable::new(42);
            computed = Computed::from_observable(&source, |v| *v);
            let _ = computed.get();
        }
        assert_eq!(computed.get(), 42);
        assert!(!computed.is_dirty());
    }
}
